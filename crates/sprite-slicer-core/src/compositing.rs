use crate::model::Rect;
use image::{Rgba, RgbaImage};

/// Copy the `src_rect` sub-rectangle of `src` into `canvas` with its top-left at (dx, dy).
///
/// Pixels are replaced, not blended. Anything falling outside `canvas` is dropped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, src_rect: Rect) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();
    let r = src_rect.clamp_to(sw, sh);
    for yy in 0..r.height() {
        for xx in 0..r.width() {
            if dx + xx < cw && dy + yy < ch {
                let px = *src.get_pixel(r.x1 + xx, r.y1 + yy);
                canvas.put_pixel(dx + xx, dy + yy, px);
            }
        }
    }
}

/// Paste `top` over `bottom` (same size) using `mask[x, y] / 255` as the per-channel blend
/// weight on all four channels.
pub fn blend_masked(bottom: &RgbaImage, top: &RgbaImage, mask: &[u8]) -> RgbaImage {
    let (w, h) = bottom.dimensions();
    let mut out = bottom.clone();
    for y in 0..h {
        for x in 0..w {
            let m = mask[(y * w + x) as usize] as u32;
            if m == 0 {
                continue;
            }
            let b = bottom.get_pixel(x, y);
            let t = top.get_pixel(x, y);
            let mut px = [0u8; 4];
            for c in 0..4 {
                px[c] = ((t[c] as u32 * m + b[c] as u32 * (255 - m) + 127) / 255) as u8;
            }
            out.put_pixel(x, y, Rgba(px));
        }
    }
    out
}
