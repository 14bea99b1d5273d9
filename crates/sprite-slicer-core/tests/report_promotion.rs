use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::json;
use sprite_slicer_core::prelude::*;
use sprite_slicer_core::report::{ReportEntry, from_json, to_json};

fn fill(img: &mut RgbaImage, r: Rect, px: [u8; 4]) {
    for y in r.y1..r.y2 {
        for x in r.x1..r.x2 {
            img.put_pixel(x, y, Rgba(px));
        }
    }
}

fn pair_sheet() -> RgbaImage {
    let mut img = RgbaImage::new(300, 120);
    fill(&mut img, Rect::new(20, 20, 100, 80), [200, 40, 40, 255]);
    fill(&mut img, Rect::new(180, 30, 240, 80), [40, 200, 40, 255]);
    // second sprite has a darker stripe so the two frames differ in content too
    fill(&mut img, Rect::new(180, 30, 240, 34), [10, 10, 10, 255]);
    img
}

fn detected_report() -> LayoutReport {
    let sheet = pair_sheet();
    let det = detect_layout("pair.png", &sheet, &SlicerConfig::default(), 1, Some(2)).expect("detect");
    let mut report = LayoutReport::default();
    report.insert("pair.png", ReportEntry::from_detection(&det, 1));
    report
}

#[test]
fn report_entry_mirrors_detection() {
    let report = detected_report();
    let entry = &report.sheets["pair.png"];
    assert_eq!(entry.layout, "auto");
    assert_eq!(entry.row_bucket_count, 1);
    assert_eq!(entry.components_found, 2);
    assert_eq!(
        entry.frames,
        vec![Rect::new(20, 20, 100, 80), Rect::new(180, 30, 240, 80)]
    );
    assert!(entry.issues.is_empty());
}

#[test]
fn json_shape_and_round_trip() {
    let report = detected_report();
    let v = to_json(&report);
    assert_eq!(v["sheets"]["pair.png"]["frames"][1], json!([180, 30, 240, 80]));
    assert_eq!(v["sheets"]["pair.png"]["sizes"][0], json!({"w": 80, "h": 60}));
    assert_eq!(v["meta"]["schema_version"], json!("1"));
    assert_eq!(v["meta"]["app"], json!("sprite-slicer"));

    let back = from_json(&v).expect("parse report");
    assert_eq!(back, report);
}

#[test]
fn degenerate_detection_lands_in_issues() {
    let sheet = pair_sheet();
    let det = detect_layout("pair.png", &sheet, &SlicerConfig::default(), 1, Some(3)).expect("detect");
    let entry = ReportEntry::from_detection(&det, 1);
    assert_eq!(entry.issues, vec!["detected 2 components, expected 3".to_string()]);
}

#[test]
fn promotion_skips_empty_entries() {
    let mut report = detected_report();
    report.insert(
        "blank.png",
        ReportEntry {
            layout: "auto".into(),
            row_bucket_count: 1,
            components_found: 0,
            frames: vec![],
            issues: vec!["detected 0 components".into()],
        },
    );
    let table = report.promote();
    assert_eq!(table.sheets.len(), 1);
    assert!(table.validate().is_ok());
    match &table.sheets["pair.png"].layout {
        LayoutEntry::Explicit { frames } => assert_eq!(frames.len(), 2),
        other => panic!("expected explicit layout, got {other:?}"),
    }
}

#[test]
fn promoted_layout_reproduces_auto_frames() {
    let cfg = SlicerConfig::default();
    let input = SheetInput {
        identity: "pair.png".into(),
        image: DynamicImage::ImageRgba8(pair_sheet()),
    };
    let auto = slice_sheet(
        &input,
        &SheetSpec::new(LayoutEntry::Auto {
            row_bucket_count: 1,
            expected_frames: Some(2),
        }),
        &cfg,
        &[],
    )
    .expect("auto slice");

    // promoted tables are stored as YAML by the command line tool
    let yaml = serde_yaml::to_string(&detected_report().promote()).expect("yaml");
    let table: LayoutTable = serde_yaml::from_str(&yaml).expect("parse table");
    let mut results = slice_sheets(std::slice::from_ref(&input), &table, &cfg);
    let (id, fixed) = results.remove(0);
    assert_eq!(id, "pair.png");
    let fixed = fixed.expect("fixed slice");

    assert!(auto.detection.is_some());
    assert!(fixed.detection.is_none());
    assert_eq!(auto.layout, fixed.layout);
    assert_eq!(auto.frames.len(), fixed.frames.len());
    for (a, f) in auto.frames.iter().zip(&fixed.frames) {
        assert_eq!(a.index, f.index);
        assert_eq!(a.content, f.content);
        assert_eq!(a.placed, f.placed);
        assert_eq!(a.rgba, f.rgba);
    }
}
