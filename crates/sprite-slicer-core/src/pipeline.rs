use crate::config::SlicerConfig;
use crate::detect::{Detection, detect_layout};
use crate::effects::{EffectStep, apply_effects};
use crate::error::{Result, SlicerError};
use crate::extract::{Extraction, extract_frames};
use crate::layout::{LayoutEntry, LayoutTable, SheetSpec};
use crate::model::{Rect, SheetIssue, SliceStats};
use crate::normalize::normalize;
use image::{DynamicImage, RgbaImage};
use tracing::{debug, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// In-memory sheet to slice (identity + decoded image).
pub struct SheetInput {
    pub identity: String,
    pub image: DynamicImage,
}

/// One normalized output frame.
#[derive(Debug, Clone)]
pub struct OutputFrame {
    /// Position in the sheet's layout sequence (0-based). Skipped indices leave gaps.
    pub index: usize,
    /// Layout rectangle the frame was cut from (sheet coordinates, clamped).
    pub source: Rect,
    /// Tight content box inside `source` (sheet coordinates).
    pub content: Rect,
    /// Where the content sits on the canvas.
    pub placed: Rect,
    pub rgba: RgbaImage,
}

/// Result of slicing one sheet.
#[derive(Debug, Clone)]
pub struct SheetOutput {
    pub identity: String,
    /// Rectangles the frames were cut from, in frame order.
    pub layout: Vec<Rect>,
    pub frames: Vec<OutputFrame>,
    pub issues: Vec<SheetIssue>,
    /// Present when the layout was detected automatically.
    pub detection: Option<Detection>,
    /// Table variant whose effects were applied, if any.
    pub variant: Option<String>,
}

impl SheetOutput {
    pub fn skipped(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| matches!(i, SheetIssue::EmptyRegion { .. }))
            .count()
    }
    pub fn is_degenerate(&self) -> bool {
        self.issues
            .iter()
            .any(|i| matches!(i, SheetIssue::DegenerateDetection { .. }))
    }
}

#[instrument(skip_all, fields(sheet = %input.identity))]
/// Slices one sheet according to `spec`, running `spec.effects` then `extra_effects` on every
/// normalized frame.
///
/// Empty regions and degenerate detections are recorded in `SheetOutput::issues` and slicing
/// continues. Content larger than the canvas aborts the sheet with a configuration error.
pub fn slice_sheet(
    input: &SheetInput,
    spec: &SheetSpec,
    cfg: &SlicerConfig,
    extra_effects: &[EffectStep],
) -> Result<SheetOutput> {
    cfg.validate()?;
    spec.layout.validate(&input.identity)?;
    let sheet = input.image.to_rgba8();

    let mut issues = Vec::new();
    let (layout, detection) = match &spec.layout {
        LayoutEntry::Auto {
            row_bucket_count,
            expected_frames,
        } => {
            let det = detect_layout(
                &input.identity,
                &sheet,
                cfg,
                *row_bucket_count,
                *expected_frames,
            )?;
            if let Some(issue) = &det.issue {
                issues.push(issue.clone());
            }
            (det.frames.clone(), Some(det))
        }
        fixed => (fixed.fixed_rects().unwrap_or_default(), None),
    };

    let mut frames = Vec::with_capacity(layout.len());
    for extraction in extract_frames(&sheet, &layout) {
        match extraction {
            Extraction::Empty { index, rect } => {
                warn!(index, %rect, "empty region, skipping frame");
                issues.push(SheetIssue::EmptyRegion { index, rect });
            }
            Extraction::Content(f) => {
                let n = normalize(&f.rgba, cfg.canvas_size).map_err(|e| {
                    SlicerError::configuration(
                        &input.identity,
                        "canvas_size",
                        format!("frame {}: {e}", f.index),
                    )
                })?;
                let rgba = apply_effects(n.rgba, n.placed, &spec.effects);
                let rgba = apply_effects(rgba, n.placed, extra_effects);
                frames.push(OutputFrame {
                    index: f.index,
                    source: f.source,
                    content: f.content,
                    placed: n.placed,
                    rgba,
                });
            }
        }
    }
    debug!(
        frames = frames.len(),
        issues = issues.len(),
        "sheet sliced"
    );

    Ok(SheetOutput {
        identity: input.identity.clone(),
        layout,
        frames,
        issues,
        detection,
        variant: None,
    })
}

/// Slices every input against `table`.
///
/// Sheets are independent: each gets its own `Result`, in input order. Identities are resolved
/// with [`LayoutTable::resolve`]; a stripped variant adds that variant's effects. With the
/// `parallel` feature sheets are processed on the rayon pool.
pub fn slice_sheets(
    inputs: &[SheetInput],
    table: &LayoutTable,
    cfg: &SlicerConfig,
) -> Vec<(String, Result<SheetOutput>)> {
    slice_sheets_with_variant(inputs, table, cfg, None)
}

/// Like [`slice_sheets`], applying `fallback_variant` to sheets whose identity did not resolve
/// through a variant suffix. A variant is applied at most once per sheet.
pub fn slice_sheets_with_variant(
    inputs: &[SheetInput],
    table: &LayoutTable,
    cfg: &SlicerConfig,
    fallback_variant: Option<&str>,
) -> Vec<(String, Result<SheetOutput>)> {
    let run = |input: &SheetInput| {
        let result = match table.resolve(&input.identity) {
            Some(resolved) => {
                let variant = resolved.variant.or(fallback_variant);
                let extra = variant.map(|v| table.variant_effects(v)).unwrap_or(&[]);
                slice_sheet(input, resolved.spec, cfg, extra).map(|mut out| {
                    out.variant = variant.map(str::to_string);
                    out
                })
            }
            None => Err(SlicerError::UnknownSheet(input.identity.clone())),
        };
        (input.identity.clone(), result)
    };

    #[cfg(feature = "parallel")]
    {
        inputs.par_iter().map(run).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        inputs.iter().map(run).collect()
    }
}

/// Turns every degenerate detection in `results` into a
/// [`SlicerError::DegenerateDetection`] failure. Returns how many sheets were rejected.
pub fn reject_degenerate(results: &mut [(String, Result<SheetOutput>)]) -> usize {
    let mut rejected = 0;
    for (id, r) in results.iter_mut() {
        let issue = match r {
            Ok(out) => out
                .issues
                .iter()
                .find(|i| matches!(i, SheetIssue::DegenerateDetection { .. }))
                .cloned(),
            Err(_) => None,
        };
        if let Some(issue) = issue {
            warn!(sheet = %id, %issue, "rejecting degenerate detection");
            *r = Err(SlicerError::DegenerateDetection {
                sheet: id.clone(),
                issue,
            });
            rejected += 1;
        }
    }
    rejected
}

/// Aggregates batch results into [`SliceStats`].
pub fn batch_stats(results: &[(String, Result<SheetOutput>)]) -> SliceStats {
    let mut stats = SliceStats::default();
    for (_, r) in results {
        match r {
            Ok(out) => {
                stats.num_sheets += 1;
                stats.num_frames += out.frames.len();
                stats.num_skipped += out.skipped();
                if out.is_degenerate() {
                    stats.num_degenerate += 1;
                }
            }
            Err(_) => stats.num_failed += 1,
        }
    }
    stats
}
