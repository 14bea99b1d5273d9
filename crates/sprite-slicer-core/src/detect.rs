use crate::config::SlicerConfig;
use crate::error::{Result, SlicerError};
use crate::label::label_with_stats;
use crate::mask::Mask;
use crate::model::{Rect, SheetIssue};
use crate::order::{occupied_rows, order};
use crate::refine::refine;
use image::RgbaImage;
use tracing::{debug, instrument, warn};

/// Output of automatic layout detection for one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Refined frame rectangles in reading order (image coordinates).
    pub frames: Vec<Rect>,
    /// Components that passed the size filter.
    pub components_found: usize,
    /// Components rejected as noise.
    pub dropped_components: usize,
    /// Set when the count is zero or differs from the expected one.
    pub issue: Option<SheetIssue>,
}

impl Detection {
    pub fn is_degenerate(&self) -> bool {
        self.issue.is_some()
    }
}

#[instrument(skip_all, fields(sheet = identity))]
/// Finds frames in `sheet` from its alpha channel.
///
/// Stages: occupancy mask at `1/scale`, `dilation_passes` rounds of 4-connected dilation,
/// flood-fill labeling with the noise filter, refinement of each rough box against the
/// full-resolution alpha, then ordering by `rows` row buckets and centroid x.
///
/// A zero or unexpected component count is reported through `Detection::issue`, never as an
/// error. `rows == 0`, or more rows than the detected frames occupy, is a configuration error.
pub fn detect_layout(
    identity: &str,
    sheet: &RgbaImage,
    cfg: &SlicerConfig,
    rows: u32,
    expected: Option<usize>,
) -> Result<Detection> {
    cfg.validate()?;
    if rows == 0 {
        return Err(SlicerError::configuration(
            identity,
            "row_bucket_count",
            "must be >= 1",
        ));
    }

    let mask = Mask::build(sheet, cfg.scale, cfg.alpha_threshold);
    let dilated = mask.dilate(cfg.dilation_passes);
    debug!(
        mask_w = mask.width(),
        mask_h = mask.height(),
        set = mask.count_set(),
        dilated_set = dilated.count_set(),
        "built occupancy mask"
    );

    let (min_w, min_h) = cfg.min_component_cells();
    let labeling = label_with_stats(&dilated, min_w, min_h);

    let refined: Vec<Rect> = labeling
        .components
        .iter()
        .filter_map(|rough| {
            let r = refine(sheet, *rough, cfg.scale, cfg.refinement_padding);
            if r.is_none() {
                warn!(%rough, "component refined to an empty region");
            }
            r
        })
        .collect();

    let frames = order(refined, sheet.height(), rows);
    let found = frames.len();

    let issue = match expected {
        _ if found == 0 => Some(SheetIssue::DegenerateDetection { expected, found }),
        Some(e) if e != found => Some(SheetIssue::DegenerateDetection { expected, found }),
        _ => None,
    };
    if let Some(issue) = &issue {
        warn!(%issue, "degenerate detection");
    }

    if found > 0 {
        let used = occupied_rows(&frames, sheet.height(), rows);
        if used < rows as usize {
            return Err(SlicerError::configuration(
                identity,
                "row_bucket_count",
                format!("{rows} rows requested but the {found} detected frames occupy {used}"),
            ));
        }
    }

    debug!(found, dropped = labeling.dropped_components, "detected frames");
    Ok(Detection {
        frames,
        components_found: labeling.components.len(),
        dropped_components: labeling.dropped_components,
        issue,
    })
}
