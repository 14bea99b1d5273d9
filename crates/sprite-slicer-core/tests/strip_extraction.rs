use image::{Rgba, RgbaImage};
use sprite_slicer_core::extract::{Extraction, extract_frames, strip_slices};
use sprite_slicer_core::model::Rect;

fn fill(img: &mut RgbaImage, r: Rect, px: Rgba<u8>) {
    for y in r.y1..r.y2 {
        for x in r.x1..r.x2 {
            img.put_pixel(x, y, px);
        }
    }
}

#[test]
fn strip_divides_evenly() {
    let union = Rect::new(12, 188, 444, 268);
    let slices = strip_slices(union, 4);
    assert_eq!(slices.len(), 4);
    assert_eq!(
        slices.iter().map(|s| s.width()).collect::<Vec<_>>(),
        vec![108, 108, 108, 108]
    );
    assert!(slices.iter().all(|s| s.height() == 80));
    assert_eq!(
        slices.iter().map(|s| s.x1).collect::<Vec<_>>(),
        vec![12, 120, 228, 336]
    );
    assert_eq!(slices[3].x2, 444);
}

#[test]
fn strip_remainder_is_not_redistributed() {
    let slices = strip_slices(Rect::new(0, 0, 10, 5), 3);
    assert_eq!(
        slices,
        vec![
            Rect::new(0, 0, 3, 5),
            Rect::new(3, 0, 6, 5),
            Rect::new(6, 0, 9, 5),
        ]
    );
    assert!(strip_slices(Rect::new(0, 0, 10, 5), 0).is_empty());
}

#[test]
fn frames_are_trimmed_to_alpha_content() {
    let mut sheet = RgbaImage::new(40, 20);
    fill(&mut sheet, Rect::new(5, 2, 9, 7), Rgba([10, 200, 30, 255]));
    let out = extract_frames(&sheet, &[Rect::new(0, 0, 20, 20), Rect::new(20, 0, 40, 20)]);
    assert_eq!(out.len(), 2);
    match &out[0] {
        Extraction::Content(f) => {
            assert_eq!(f.index, 0);
            assert_eq!(f.source, Rect::new(0, 0, 20, 20));
            assert_eq!(f.content, Rect::new(5, 2, 9, 7));
            assert_eq!(f.rgba.dimensions(), (4, 5));
            assert_eq!(*f.rgba.get_pixel(0, 0), Rgba([10, 200, 30, 255]));
        }
        other => panic!("expected content, got {other:?}"),
    }
    match &out[1] {
        Extraction::Empty { index, rect } => {
            assert_eq!(*index, 1);
            assert_eq!(*rect, Rect::new(20, 0, 40, 20));
        }
        other => panic!("expected empty, got {other:?}"),
    }
}

#[test]
fn faint_pixels_count_as_content() {
    let mut sheet = RgbaImage::new(10, 10);
    sheet.put_pixel(7, 8, Rgba([0, 0, 0, 1]));
    let out = extract_frames(&sheet, &[Rect::new(0, 0, 10, 10)]);
    match &out[0] {
        Extraction::Content(f) => assert_eq!(f.content, Rect::new(7, 8, 8, 9)),
        other => panic!("expected content, got {other:?}"),
    }
}

#[test]
fn explicit_rects_are_clamped_to_sheet() {
    let mut sheet = RgbaImage::new(40, 20);
    fill(&mut sheet, Rect::new(32, 10, 40, 20), Rgba([255, 0, 0, 255]));
    let out = extract_frames(&sheet, &[Rect::new(30, 0, 100, 100)]);
    match &out[0] {
        Extraction::Content(f) => {
            assert_eq!(f.source, Rect::new(30, 0, 40, 20));
            assert_eq!(f.content, Rect::new(32, 10, 40, 20));
        }
        other => panic!("expected content, got {other:?}"),
    }
}

#[test]
fn overlapping_explicit_rects_are_used_verbatim() {
    let mut sheet = RgbaImage::new(50, 50);
    fill(&mut sheet, Rect::new(10, 10, 30, 30), Rgba([1, 2, 3, 255]));
    let rects = [Rect::new(0, 0, 20, 20), Rect::new(15, 15, 50, 50)];
    let out = extract_frames(&sheet, &rects);
    let contents: Vec<Rect> = out
        .iter()
        .filter_map(|e| match e {
            Extraction::Content(f) => Some(f.content),
            Extraction::Empty { .. } => None,
        })
        .collect();
    assert_eq!(contents, vec![Rect::new(10, 10, 20, 20), Rect::new(15, 15, 30, 30)]);
    assert_eq!(out[1].index(), 1);
}
