use crate::detect::Detection;
use crate::layout::{LayoutEntry, LayoutTable, SheetSpec};
use crate::model::Rect;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Detected layout of one sheet, kept for review before promotion to a fixed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Always `"auto"` for detector output.
    pub layout: String,
    pub row_bucket_count: u32,
    pub components_found: usize,
    pub frames: Vec<Rect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl ReportEntry {
    pub fn from_detection(det: &Detection, row_bucket_count: u32) -> Self {
        Self {
            layout: "auto".into(),
            row_bucket_count,
            components_found: det.components_found,
            frames: det.frames.clone(),
            issues: det.issue.iter().map(|i| i.to_string()).collect(),
        }
    }
}

/// `{ sheet identity -> ordered rectangles }` for a detection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutReport {
    #[serde(default)]
    pub sheets: BTreeMap<String, ReportEntry>,
}

impl LayoutReport {
    pub fn insert(&mut self, identity: impl Into<String>, entry: ReportEntry) {
        self.sheets.insert(identity.into(), entry);
    }

    /// Converts every entry with at least one frame into an explicit fixed layout.
    pub fn promote(&self) -> LayoutTable {
        let mut table = LayoutTable::default();
        for (identity, entry) in &self.sheets {
            if entry.frames.is_empty() {
                continue;
            }
            table.insert(
                identity.clone(),
                SheetSpec::new(LayoutEntry::Explicit {
                    frames: entry.frames.clone(),
                }),
            );
        }
        table
    }
}

/// Serialize the report as `{ sheets: { identity: { layout, frames: [[x1,y1,x2,y2], ..], .. } }, meta }`.
pub fn to_json(report: &LayoutReport) -> Value {
    let sheets: serde_json::Map<String, Value> = report
        .sheets
        .iter()
        .map(|(id, e)| {
            let frames: Vec<Value> = e
                .frames
                .iter()
                .map(|r| json!([r.x1, r.y1, r.x2, r.y2]))
                .collect();
            let sizes: Vec<Value> = e
                .frames
                .iter()
                .map(|r| json!({"w": r.width(), "h": r.height()}))
                .collect();
            (
                id.clone(),
                json!({
                    "layout": e.layout,
                    "row_bucket_count": e.row_bucket_count,
                    "components_found": e.components_found,
                    "frames": frames,
                    "sizes": sizes,
                    "issues": e.issues,
                }),
            )
        })
        .collect();
    json!({
        "sheets": sheets,
        "meta": {
            "app": "sprite-slicer",
            "version": env!("CARGO_PKG_VERSION"),
            "schema_version": "1",
        }
    })
}

/// Reads a report written by [`to_json`] back (extra keys such as `sizes` are ignored).
pub fn from_json(value: &Value) -> serde_json::Result<LayoutReport> {
    LayoutReport::deserialize(value)
}
