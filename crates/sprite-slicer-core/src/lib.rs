//! Core library for slicing sprite sheets into normalized animation frames.
//!
//! - Detection: alpha occupancy mask (downsampled), 4-connected dilation, flood-fill labeling,
//!   full-resolution refinement, row-bucketed reading order
//! - Layouts: `auto` detection, or fixed `strip` / `explicit` tables keyed by sheet identity
//! - Output: frames cropped to their alpha content and centered on a square transparent canvas
//! - Post-processing: pure per-pixel effects (darken, outline, dark-pixel recolor) composed at the edge
//!
//! Quick example:
//! ```ignore
//! use image::ImageReader;
//! use sprite_slicer_core::{LayoutEntry, SheetInput, SheetSpec, SlicerConfig, slice_sheet};
//! # fn main() -> anyhow::Result<()> {
//! let image = ImageReader::open("hare_walk.png")?.decode()?;
//! let input = SheetInput { identity: "hare_walk.png".into(), image };
//! let spec = SheetSpec::new(LayoutEntry::Auto { row_bucket_count: 1, expected_frames: Some(4) });
//! let out = slice_sheet(&input, &spec, &SlicerConfig::default(), &[])?;
//! println!("frames: {}", out.frames.len());
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod detect;
pub mod effects;
pub mod error;
pub mod extract;
pub mod label;
pub mod layout;
pub mod mask;
pub mod model;
pub mod normalize;
pub mod order;
pub mod pipeline;
pub mod refine;
pub mod report;

pub use config::*;
pub use detect::*;
pub use error::*;
pub use layout::*;
pub use model::*;
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `sprite_slicer_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{SlicerConfig, SlicerConfigBuilder};
    pub use crate::detect::{Detection, detect_layout};
    pub use crate::effects::{EffectStep, RelativeRegion};
    pub use crate::extract::{Extraction, extract_frames, strip_slices};
    pub use crate::label::label;
    pub use crate::layout::{LayoutEntry, LayoutTable, SheetSpec};
    pub use crate::mask::Mask;
    pub use crate::model::{Rect, SheetIssue, SliceStats};
    pub use crate::normalize::{center_offset, normalize};
    pub use crate::order::order;
    pub use crate::refine::refine;
    pub use crate::report::LayoutReport;
    pub use crate::{
        OutputFrame, SheetInput, SheetOutput, reject_degenerate, slice_sheet, slice_sheets,
        slice_sheets_with_variant,
    };
}
