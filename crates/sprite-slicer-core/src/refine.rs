use crate::model::Rect;
use image::RgbaImage;

/// Tight bounding box (image coordinates) of pixels with alpha `> threshold` inside `region`.
///
/// `region` is clamped to the image first. Returns `None` when nothing in it is visible.
pub fn content_bounds(rgba: &RgbaImage, region: Rect, threshold: u8) -> Option<Rect> {
    let (w, h) = rgba.dimensions();
    let r = region.clamp_to(w, h);
    if r.is_empty() {
        return None;
    }
    let visible = |x: u32, y: u32| rgba.get_pixel(x, y)[3] > threshold;

    // left
    let mut x1 = r.x1;
    while x1 < r.x2 && !(r.y1..r.y2).any(|y| visible(x1, y)) {
        x1 += 1;
    }
    if x1 >= r.x2 {
        return None;
    }
    // right (inclusive)
    let mut x2 = r.x2 - 1;
    while x2 > x1 && !(r.y1..r.y2).any(|y| visible(x2, y)) {
        x2 -= 1;
    }
    // top
    let mut y1 = r.y1;
    while y1 < r.y2 && !(x1..=x2).any(|x| visible(x, y1)) {
        y1 += 1;
    }
    // bottom (inclusive)
    let mut y2 = r.y2 - 1;
    while y2 > y1 && !(x1..=x2).any(|x| visible(x, y2)) {
        y2 -= 1;
    }
    Some(Rect::new(x1, y1, x2 + 1, y2 + 1))
}

/// Tight box of every pixel with alpha `> 0` in the whole image.
pub fn image_content_bounds(rgba: &RgbaImage) -> Option<Rect> {
    let (w, h) = rgba.dimensions();
    content_bounds(rgba, Rect::new(0, 0, w, h), 0)
}

/// Maps a rough mask-space box back onto the full-resolution image and tightens it.
///
/// The box is multiplied by `scale`, grown by `padding` on each side, clamped to the image and
/// then shrunk to the first/last rows and columns holding any pixel with alpha `> 0`. Works on
/// the undilated original, so the result is exact even though detection was coarse.
pub fn refine(rgba: &RgbaImage, rough: Rect, scale: u32, padding: u32) -> Option<Rect> {
    let (w, h) = rgba.dimensions();
    let window = rough.scaled(scale.max(1)).expand(padding).clamp_to(w, h);
    content_bounds(rgba, window, 0)
}
