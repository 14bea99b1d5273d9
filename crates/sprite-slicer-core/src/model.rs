use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle (pixels or mask cells), half-open: `x1..x2`, `y1..y2`.
///
/// Serialized as `[x1, y1, x2, y2]`, the shape layout tables and detection
/// reports use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "[u32; 4]", into = "[u32; 4]")]
pub struct Rect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rect {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }
    /// Rectangle anchored at `(x, y)` with the given size.
    pub fn from_size(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self::new(x, y, x + w, y + h)
    }
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }
    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
    /// Twice the centroid, `(x1 + x2, y1 + y2)`. Keeps ordering keys integral.
    pub fn centroid2(&self) -> (u64, u64) {
        (
            self.x1 as u64 + self.x2 as u64,
            self.y1 as u64 + self.y2 as u64,
        )
    }
    /// Clamps both corners into `0..=w`, `0..=h`.
    pub fn clamp_to(&self, w: u32, h: u32) -> Rect {
        let x1 = self.x1.min(w);
        let y1 = self.y1.min(h);
        Rect::new(x1, y1, self.x2.min(w).max(x1), self.y2.min(h).max(y1))
    }
    /// Grows by `pad` on every side, saturating at zero on the top/left.
    pub fn expand(&self, pad: u32) -> Rect {
        Rect::new(
            self.x1.saturating_sub(pad),
            self.y1.saturating_sub(pad),
            self.x2.saturating_add(pad),
            self.y2.saturating_add(pad),
        )
    }
    /// Multiplies every coordinate by `scale` (mask space to image space).
    pub fn scaled(&self, scale: u32) -> Rect {
        Rect::new(
            self.x1.saturating_mul(scale),
            self.y1.saturating_mul(scale),
            self.x2.saturating_mul(scale),
            self.y2.saturating_mul(scale),
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})-({},{}) {}x{}",
            self.x1,
            self.y1,
            self.x2,
            self.y2,
            self.width(),
            self.height()
        )
    }
}

impl TryFrom<[u32; 4]> for Rect {
    type Error = String;
    fn try_from(v: [u32; 4]) -> Result<Self, Self::Error> {
        let [x1, y1, x2, y2] = v;
        if x1 > x2 || y1 > y2 {
            return Err(format!(
                "inverted rectangle [{x1}, {y1}, {x2}, {y2}]: expected x1 <= x2 and y1 <= y2"
            ));
        }
        Ok(Rect::new(x1, y1, x2, y2))
    }
}

impl From<Rect> for [u32; 4] {
    fn from(r: Rect) -> Self {
        [r.x1, r.y1, r.x2, r.y2]
    }
}

/// Statistics over a batch of sliced sheets.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SliceStats {
    /// Sheets that produced an output (possibly with issues).
    pub num_sheets: usize,
    /// Sheets that aborted with an error.
    pub num_failed: usize,
    /// Frames written out.
    pub num_frames: usize,
    /// Layout indices skipped because their region had no visible content.
    pub num_skipped: usize,
    /// Automatic detections whose component count was zero or unexpected.
    pub num_degenerate: usize,
}

impl SliceStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Sheets: {}, Failed: {}, Frames: {}, Skipped: {}, Degenerate detections: {}",
            self.num_sheets, self.num_failed, self.num_frames, self.num_skipped, self.num_degenerate,
        )
    }

    /// True if every sheet succeeded without skipped frames or degenerate detections.
    pub fn is_clean(&self) -> bool {
        self.num_failed == 0 && self.num_skipped == 0 && self.num_degenerate == 0
    }
}

/// Recoverable anomaly found while processing one sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetIssue {
    /// A layout rectangle held no visible pixel; its index was skipped.
    EmptyRegion { index: usize, rect: Rect },
    /// Automatic detection found no components, or a count other than the expected one.
    /// Merged sprites (gap narrower than the dilation reach) show up here.
    DegenerateDetection {
        expected: Option<usize>,
        found: usize,
    },
}

impl fmt::Display for SheetIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetIssue::EmptyRegion { index, rect } => {
                write!(f, "frame {index}: region {rect} has no visible content")
            }
            SheetIssue::DegenerateDetection {
                expected: Some(e),
                found,
            } => write!(f, "detected {found} components, expected {e}"),
            SheetIssue::DegenerateDetection {
                expected: None,
                found,
            } => write!(f, "detected {found} components"),
        }
    }
}
