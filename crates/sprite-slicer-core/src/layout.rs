use crate::effects::EffectStep;
use crate::error::{Result, SlicerError};
use crate::extract::strip_slices;
use crate::model::Rect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Where a sheet's frame rectangles come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutEntry {
    /// Detect components from alpha. `row_bucket_count` is the number of frame rows the sheet
    /// family is drawn with; it cannot be inferred from pixels.
    Auto {
        row_bucket_count: u32,
        /// Expected number of frames; a different count is reported as degenerate.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_frames: Option<usize>,
    },
    /// Union box split into `count` equal-width slices.
    Strip { bbox: Rect, count: u32 },
    /// Hand-verified rectangles, used verbatim.
    Explicit { frames: Vec<Rect> },
}

impl LayoutEntry {
    /// Fixed rectangles for `strip`/`explicit`, `None` for `auto`.
    pub fn fixed_rects(&self) -> Option<Vec<Rect>> {
        match self {
            LayoutEntry::Auto { .. } => None,
            LayoutEntry::Strip { bbox, count } => Some(strip_slices(*bbox, *count)),
            LayoutEntry::Explicit { frames } => Some(frames.clone()),
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, LayoutEntry::Auto { .. })
    }

    /// Checks the entry on its own; `sheet` names it in the error.
    pub fn validate(&self, sheet: &str) -> Result<()> {
        match self {
            LayoutEntry::Auto {
                row_bucket_count, ..
            } => {
                if *row_bucket_count == 0 {
                    return Err(SlicerError::configuration(
                        sheet,
                        "row_bucket_count",
                        "must be >= 1",
                    ));
                }
            }
            LayoutEntry::Strip { bbox, count } => {
                if *count == 0 {
                    return Err(SlicerError::configuration(sheet, "count", "must be >= 1"));
                }
                if bbox.is_empty() {
                    return Err(SlicerError::configuration(
                        sheet,
                        "bbox",
                        format!("union box {bbox} is empty"),
                    ));
                }
                if bbox.width() < *count {
                    return Err(SlicerError::configuration(
                        sheet,
                        "count",
                        format!("{} frames do not fit in a {}px wide union box", count, bbox.width()),
                    ));
                }
            }
            LayoutEntry::Explicit { frames } => {
                if frames.is_empty() {
                    return Err(SlicerError::configuration(
                        sheet,
                        "frames",
                        "explicit layout lists no rectangles",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Layout plus post-processing for one sheet identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSpec {
    pub layout: LayoutEntry,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectStep>,
}

impl SheetSpec {
    pub fn new(layout: LayoutEntry) -> Self {
        Self {
            layout,
            effects: Vec::new(),
        }
    }
}

/// Sheet identity -> layout table, plus named variants (extra effect chains).
///
/// A sheet `bear_dark.png` resolves to the `bear.png` entry when `dark` is a variant, and the
/// variant's effects run after the sheet's own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutTable {
    #[serde(default)]
    pub sheets: BTreeMap<String, SheetSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variants: BTreeMap<String, Vec<EffectStep>>,
}

/// A table lookup result.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    /// Table key that matched.
    pub key: &'a str,
    pub spec: &'a SheetSpec,
    /// Variant whose suffix was stripped from the identity, if any.
    pub variant: Option<&'a str>,
}

impl LayoutTable {
    pub fn insert(&mut self, identity: impl Into<String>, spec: SheetSpec) {
        self.sheets.insert(identity.into(), spec);
    }

    /// Validates every entry.
    pub fn validate(&self) -> Result<()> {
        for (key, spec) in &self.sheets {
            spec.layout.validate(key)?;
        }
        Ok(())
    }

    /// Finds the entry for `identity`.
    ///
    /// Tried in order: exact key; the identity with a `_<variant>` stem suffix removed; a key
    /// with the same file stem.
    pub fn resolve(&self, identity: &str) -> Option<Resolved<'_>> {
        if let Some((key, spec)) = self.sheets.get_key_value(identity) {
            return Some(Resolved {
                key,
                spec,
                variant: None,
            });
        }
        let (stem, ext) = split_stem(identity);
        for variant in self.variants.keys() {
            let suffix = format!("_{variant}");
            if let Some(base) = stem.strip_suffix(&suffix) {
                if let Some(found) = self.lookup(base, ext) {
                    return Some(Resolved {
                        variant: Some(variant.as_str()),
                        ..found
                    });
                }
            }
        }
        self.lookup(stem, ext)
    }

    /// Effects of a named variant (empty when unknown).
    pub fn variant_effects(&self, variant: &str) -> &[EffectStep] {
        self.variants.get(variant).map(Vec::as_slice).unwrap_or(&[])
    }

    fn lookup(&self, stem: &str, ext: &str) -> Option<Resolved<'_>> {
        let full = format!("{stem}{ext}");
        if let Some((key, spec)) = self.sheets.get_key_value(full.as_str()) {
            return Some(Resolved {
                key,
                spec,
                variant: None,
            });
        }
        self.sheets
            .iter()
            .find(|(k, _)| split_stem(k).0 == stem)
            .map(|(key, spec)| Resolved {
                key,
                spec,
                variant: None,
            })
    }
}

/// Splits `name.png` into (`name`, `.png`). Only the final path component is considered.
fn split_stem(identity: &str) -> (&str, &str) {
    let file = Path::new(identity)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(identity);
    match file.rfind('.') {
        Some(i) if i > 0 => (&file[..i], &file[i..]),
        _ => (file, ""),
    }
}
