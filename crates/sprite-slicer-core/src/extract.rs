use crate::model::Rect;
use crate::refine::content_bounds;
use image::RgbaImage;
use image::imageops;

/// Splits a union box into `count` equal-width slices of full union height.
///
/// Slice width is `union.width() / count`; the remainder columns right of the last slice
/// belong to no slice. Returns an empty list for `count == 0`.
pub fn strip_slices(union: Rect, count: u32) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let fw = union.width() / count;
    (0..count)
        .map(|i| Rect::new(union.x1 + i * fw, union.y1, union.x1 + (i + 1) * fw, union.y2))
        .collect()
}

/// One frame cut out of a sheet, trimmed to its visible content.
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    /// Position in the layout sequence.
    pub index: usize,
    /// Layout rectangle after clamping to the sheet.
    pub source: Rect,
    /// Tight alpha box inside `source` (sheet coordinates).
    pub content: Rect,
    /// Pixels of `content`.
    pub rgba: RgbaImage,
}

/// Outcome of extracting one layout rectangle.
#[derive(Debug, Clone)]
pub enum Extraction {
    Content(ExtractedFrame),
    /// The rectangle holds no pixel with alpha > 0; the index is skipped.
    Empty { index: usize, rect: Rect },
}

impl Extraction {
    pub fn index(&self) -> usize {
        match self {
            Extraction::Content(f) => f.index,
            Extraction::Empty { index, .. } => *index,
        }
    }
}

/// Crops each rectangle from `sheet` and trims it to its tight alpha box.
///
/// Rectangles are clamped to the sheet; positions and sizes are otherwise used verbatim.
pub fn extract_frames(sheet: &RgbaImage, rects: &[Rect]) -> Vec<Extraction> {
    let (w, h) = sheet.dimensions();
    rects
        .iter()
        .enumerate()
        .map(|(index, r)| {
            let source = r.clamp_to(w, h);
            match content_bounds(sheet, source, 0) {
                Some(content) => Extraction::Content(ExtractedFrame {
                    index,
                    source,
                    content,
                    rgba: crop(sheet, content),
                }),
                None => Extraction::Empty {
                    index,
                    rect: source,
                },
            }
        })
        .collect()
}

/// Copies `rect` (clamped) out of `sheet` into a new buffer.
pub fn crop(sheet: &RgbaImage, rect: Rect) -> RgbaImage {
    let (w, h) = sheet.dimensions();
    let r = rect.clamp_to(w, h);
    imageops::crop_imm(sheet, r.x1, r.y1, r.width(), r.height()).to_image()
}
