use image::{DynamicImage, Rgba, RgbaImage};
use sprite_slicer_core::effects::EffectStep;
use sprite_slicer_core::error::SlicerError;
use sprite_slicer_core::pipeline::batch_stats;
use sprite_slicer_core::prelude::*;

const TABLE: &str = r#"
sheets:
  black_bear_walk.png:
    layout: { kind: strip, bbox: [12, 20, 444, 100], count: 4 }
    effects:
      - effect: outline
        color: [120, 120, 120]
  leopard_cat_walk.png:
    layout:
      kind: explicit
      frames:
        - [10, 105, 221, 210]
        - [235, 105, 446, 210]
  hare_walk.png:
    layout: { kind: auto, row_bucket_count: 1, expected_frames: 4 }
variants:
  dark:
    - effect: darken
      factor: 0.7
    - effect: recolor_dark
"#;

const SPRITE: Rgba<u8> = Rgba([200, 100, 50, 255]);

/// 456x120 strip sheet; sprite `i` is 60x40 at x = 12 + i*108 + 20, y = 30.
fn strip_sheet(present: &[usize]) -> RgbaImage {
    let mut img = RgbaImage::new(456, 120);
    for &i in present {
        let x0 = 12 + i as u32 * 108 + 20;
        for y in 30..70 {
            for x in x0..x0 + 60 {
                img.put_pixel(x, y, SPRITE);
            }
        }
    }
    img
}

fn strip_spec() -> SheetSpec {
    SheetSpec::new(LayoutEntry::Strip {
        bbox: Rect::new(12, 20, 444, 100),
        count: 4,
    })
}

fn input(identity: &str, img: RgbaImage) -> SheetInput {
    SheetInput {
        identity: identity.into(),
        image: DynamicImage::ImageRgba8(img),
    }
}

#[test]
fn yaml_table_parses_all_layout_kinds() {
    let table: LayoutTable = serde_yaml::from_str(TABLE).expect("yaml");
    table.validate().expect("valid");
    assert_eq!(table.sheets.len(), 3);

    let bear = &table.sheets["black_bear_walk.png"];
    assert_eq!(
        bear.layout,
        LayoutEntry::Strip {
            bbox: Rect::new(12, 20, 444, 100),
            count: 4
        }
    );
    assert_eq!(bear.effects, vec![EffectStep::Outline { color: [120, 120, 120] }]);

    let cat = &table.sheets["leopard_cat_walk.png"];
    assert_eq!(cat.layout.fixed_rects().map(|r| r.len()), Some(2));
    assert!(table.sheets["hare_walk.png"].layout.is_auto());

    let dark = table.variant_effects("dark");
    assert_eq!(dark.len(), 2);
    assert!(matches!(dark[1], EffectStep::RecolorDark { threshold: 30, .. }));
    assert!(table.variant_effects("missing").is_empty());
}

#[test]
fn inverted_rectangles_are_rejected() {
    let bad = "sheets:\n  a.png:\n    layout: { kind: explicit, frames: [[10, 0, 5, 5]] }\n";
    assert!(serde_yaml::from_str::<LayoutTable>(bad).is_err());
}

#[test]
fn resolve_strips_variant_suffix_and_directories() {
    let table: LayoutTable = serde_yaml::from_str(TABLE).expect("yaml");

    let r = table.resolve("black_bear_walk.png").expect("exact");
    assert_eq!((r.key, r.variant), ("black_bear_walk.png", None));

    let r = table.resolve("black_bear_walk_dark.png").expect("variant");
    assert_eq!((r.key, r.variant), ("black_bear_walk.png", Some("dark")));

    let r = table.resolve("assets/pets/leopard_cat_walk_dark.png").expect("nested variant");
    assert_eq!((r.key, r.variant), ("leopard_cat_walk.png", Some("dark")));

    let r = table.resolve("assets/hare_walk.png").expect("nested");
    assert_eq!((r.key, r.variant), ("hare_walk.png", None));

    assert!(table.resolve("muntjac_walk.png").is_none());
    assert!(table.resolve("black_bear_walk_light.png").is_none());
}

#[test]
fn validation_names_sheet_and_parameter() {
    let mut table = LayoutTable::default();
    table.insert(
        "zero.png",
        SheetSpec::new(LayoutEntry::Strip {
            bbox: Rect::new(0, 0, 100, 10),
            count: 0,
        }),
    );
    match table.validate() {
        Err(SlicerError::Configuration { sheet, parameter, .. }) => {
            assert_eq!(sheet, "zero.png");
            assert_eq!(parameter, "count");
        }
        other => panic!("expected configuration error, got {other:?}"),
    }

    let narrow = LayoutEntry::Strip {
        bbox: Rect::new(0, 0, 3, 10),
        count: 4,
    };
    assert!(narrow.validate("narrow.png").is_err());
    assert!(LayoutEntry::Explicit { frames: vec![] }.validate("e.png").is_err());
    assert!(
        LayoutEntry::Auto {
            row_bucket_count: 0,
            expected_frames: None
        }
        .validate("a.png")
        .is_err()
    );
}

#[test]
fn strip_layout_centers_every_slice() {
    let out = slice_sheet(
        &input("bear.png", strip_sheet(&[0, 1, 2, 3])),
        &strip_spec(),
        &SlicerConfig::default(),
        &[],
    )
    .expect("slice");
    assert!(out.issues.is_empty());
    assert!(out.detection.is_none());
    assert_eq!(out.frames.len(), 4);
    for (i, f) in out.frames.iter().enumerate() {
        assert_eq!(f.index, i);
        assert_eq!(f.source, Rect::new(12 + i as u32 * 108, 20, 120 + i as u32 * 108, 100));
        assert_eq!(f.content, Rect::from_size(32 + i as u32 * 108, 30, 60, 40));
        assert_eq!(f.placed, Rect::from_size(98, 108, 60, 40));
        assert_eq!(*f.rgba.get_pixel(98, 108), SPRITE);
        assert_eq!(f.rgba.get_pixel(97, 108)[3], 0);
    }
}

#[test]
fn empty_slice_is_skipped_and_reported() {
    let out = slice_sheet(
        &input("bear.png", strip_sheet(&[0, 1, 3])),
        &strip_spec(),
        &SlicerConfig::default(),
        &[],
    )
    .expect("slice");
    assert_eq!(
        out.frames.iter().map(|f| f.index).collect::<Vec<_>>(),
        vec![0, 1, 3]
    );
    assert_eq!(
        out.issues,
        vec![SheetIssue::EmptyRegion {
            index: 2,
            rect: Rect::new(228, 20, 336, 100)
        }]
    );
    assert_eq!(out.skipped(), 1);
}

#[test]
fn content_larger_than_canvas_aborts_the_sheet() {
    let cfg = SlicerConfig::builder().canvas_size(32).build();
    match slice_sheet(&input("bear.png", strip_sheet(&[0])), &strip_spec(), &cfg, &[]) {
        Err(SlicerError::Configuration { sheet, parameter, .. }) => {
            assert_eq!(sheet, "bear.png");
            assert_eq!(parameter, "canvas_size");
        }
        other => panic!("expected configuration error, got {:?}", other.map(|o| o.frames.len())),
    }
}

#[test]
fn variant_effects_run_after_sheet_effects() {
    let mut table = LayoutTable::default();
    table.insert("bear.png", strip_spec());
    table
        .variants
        .insert("dark".into(), vec![EffectStep::Darken { factor: 0.5 }]);

    let inputs = vec![
        input("bear.png", strip_sheet(&[0, 1, 2, 3])),
        input("bear_dark.png", strip_sheet(&[0, 1, 2, 3])),
        input("fox.png", strip_sheet(&[0])),
    ];
    let results = slice_sheets(&inputs, &table, &SlicerConfig::default());
    assert_eq!(results.len(), 3);

    let plain = results[0].1.as_ref().expect("plain");
    assert_eq!(*plain.frames[0].rgba.get_pixel(98, 108), SPRITE);

    assert_eq!(results[1].0, "bear_dark.png");
    let dark = results[1].1.as_ref().expect("dark");
    assert_eq!(*dark.frames[0].rgba.get_pixel(98, 108), Rgba([100, 50, 25, 255]));

    assert!(matches!(&results[2].1, Err(SlicerError::UnknownSheet(id)) if id == "fox.png"));

    let stats = batch_stats(&results);
    assert_eq!(stats.num_sheets, 2);
    assert_eq!(stats.num_failed, 1);
    assert_eq!(stats.num_frames, 8);
    assert!(!stats.is_clean());
}

#[test]
fn explicit_layout_keeps_table_order() {
    let mut img = RgbaImage::new(100, 50);
    img.put_pixel(80, 10, Rgba([1, 1, 1, 255]));
    img.put_pixel(10, 10, Rgba([2, 2, 2, 255]));
    let spec = SheetSpec::new(LayoutEntry::Explicit {
        frames: vec![Rect::new(50, 0, 100, 50), Rect::new(0, 0, 50, 50)],
    });
    let cfg = SlicerConfig::builder().canvas_size(8).build();
    let out = slice_sheet(&input("e.png", img), &spec, &cfg, &[]).expect("slice");
    assert_eq!(out.frames[0].content, Rect::new(80, 10, 81, 11));
    assert_eq!(out.frames[1].content, Rect::new(10, 10, 11, 11));
    // 1x1 content on an 8px canvas lands at (3, 3)
    assert_eq!(*out.frames[0].rgba.get_pixel(3, 3), Rgba([1, 1, 1, 255]));
}

#[test]
fn fallback_variant_applies_once() {
    let mut table = LayoutTable::default();
    table.insert("bear.png", strip_spec());
    table
        .variants
        .insert("dark".into(), vec![EffectStep::Darken { factor: 0.5 }]);

    let inputs = vec![
        input("bear.png", strip_sheet(&[0])),
        input("bear_dark.png", strip_sheet(&[0])),
    ];
    let results = slice_sheets_with_variant(&inputs, &table, &SlicerConfig::default(), Some("dark"));
    for (id, r) in &results {
        let out = r.as_ref().expect(id);
        assert_eq!(out.variant.as_deref(), Some("dark"), "{id}");
        assert_eq!(*out.frames[0].rgba.get_pixel(98, 108), Rgba([100, 50, 25, 255]), "{id}");
    }

    let results = slice_sheets(&inputs[..1], &table, &SlicerConfig::default());
    let plain = results[0].1.as_ref().expect("plain");
    assert_eq!(plain.variant, None);
    assert_eq!(*plain.frames[0].rgba.get_pixel(98, 108), SPRITE);
}
