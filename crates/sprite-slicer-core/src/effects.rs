//! Per-pixel post-processing applied to frames after normalization.
//!
//! Every function is pure (`image in -> image out`) and independent of detection, so the
//! pipeline only composes them at its edge. Regions in [`EffectStep`] are fractions of the
//! frame's content box, which keeps one table entry valid for every frame of a sheet.

use crate::compositing::blend_masked;
use crate::model::Rect;
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sub-region of a content box in fractions of its width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeRegion {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Default for RelativeRegion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            w: 1.0,
            h: 1.0,
        }
    }
}

impl RelativeRegion {
    /// Top-right corner covering `frac` of the width and height.
    pub fn top_right(frac: f32) -> Self {
        Self {
            x: 1.0 - frac,
            y: 0.0,
            w: frac,
            h: frac,
        }
    }

    /// Absolute rectangle inside `content`. Fractions are clamped to `0..=1`.
    pub fn resolve(&self, content: Rect) -> Rect {
        let cw = content.width() as f32;
        let ch = content.height() as f32;
        let fx = self.x.clamp(0.0, 1.0);
        let fy = self.y.clamp(0.0, 1.0);
        let fx2 = (self.x + self.w).clamp(fx, 1.0);
        let fy2 = (self.y + self.h).clamp(fy, 1.0);
        Rect::new(
            content.x1 + (cw * fx) as u32,
            content.y1 + (ch * fy) as u32,
            content.x1 + (cw * fx2).ceil() as u32,
            content.y1 + (ch * fy2).ceil() as u32,
        )
        .clamp_to(content.x2, content.y2)
    }
}

/// Image plus the number of pixels an effect touched.
#[derive(Debug, Clone)]
pub struct Recolored {
    pub image: RgbaImage,
    pub changed: usize,
}

/// Multiplies RGB by `factor` (clamped to 0..=255); alpha is untouched.
pub fn darken(rgba: &RgbaImage, factor: f32) -> RgbaImage {
    let factor = factor.max(0.0);
    let mut out = rgba.clone();
    for px in out.pixels_mut() {
        for c in 0..3 {
            px[c] = (px[c] as f32 * factor).round().min(255.0) as u8;
        }
    }
    out
}

/// Draws a 1px halo of `color` around visible content.
///
/// The alpha channel is grown with a 3x3 max filter; the halo layer carries `color` weighted by
/// the grown alpha and sits below the original, which is blended on top by its own alpha.
pub fn outline(rgba: &RgbaImage, color: [u8; 3]) -> RgbaImage {
    let (w, h) = rgba.dimensions();
    let alpha: Vec<u8> = rgba.pixels().map(|p| p[3]).collect();
    let mut halo = RgbaImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let mut m = 0u8;
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    m = m.max(alpha[(ny * w + nx) as usize]);
                }
            }
            if m > 0 {
                let k = m as u32;
                halo.put_pixel(
                    x,
                    y,
                    Rgba([
                        ((color[0] as u32 * k + 127) / 255) as u8,
                        ((color[1] as u32 * k + 127) / 255) as u8,
                        ((color[2] as u32 * k + 127) / 255) as u8,
                        m,
                    ]),
                );
            }
        }
    }
    blend_masked(&halo, rgba, &alpha)
}

/// Replaces every visible pixel in `region` whose R, G and B are all below `threshold`.
pub fn recolor_dark(rgba: &RgbaImage, region: Rect, threshold: u8, color: [u8; 4]) -> Recolored {
    let (w, h) = rgba.dimensions();
    let r = region.clamp_to(w, h);
    let mut image = rgba.clone();
    let mut changed = 0;
    for y in r.y1..r.y2 {
        for x in r.x1..r.x2 {
            let p = image.get_pixel(x, y);
            if p[3] > 0 && p[0] < threshold && p[1] < threshold && p[2] < threshold {
                image.put_pixel(x, y, Rgba(color));
                changed += 1;
            }
        }
    }
    Recolored { image, changed }
}

/// Marks one pixel at a fractional anchor of `content` (`anchor = [fx, fy]`).
///
/// If the anchor pixel is transparent, the `2r x 2r` window starting `r` pixels up-left of it
/// is scanned column by column and the first visible pixel is marked instead.
pub fn mark_anchor(
    rgba: &RgbaImage,
    content: Rect,
    anchor: [f32; 2],
    radius: u32,
    color: [u8; 4],
) -> Recolored {
    let (w, h) = rgba.dimensions();
    let mut image = rgba.clone();
    let ax = content.x1 as i64 + (content.width() as f32 * anchor[0]) as i64;
    let ay = content.y1 as i64 + (content.height() as f32 * anchor[1]) as i64;
    let visible = |img: &RgbaImage, x: i64, y: i64| {
        x >= 0 && y >= 0 && x < w as i64 && y < h as i64 && img.get_pixel(x as u32, y as u32)[3] > 0
    };

    let target = if visible(&image, ax, ay) {
        Some((ax, ay))
    } else {
        let r = radius as i64;
        (-r..r)
            .flat_map(|ox| (-r..r).map(move |oy| (ax + ox, ay + oy)))
            .find(|(x, y)| visible(&image, *x, *y))
    };
    let changed = match target {
        Some((x, y)) => {
            image.put_pixel(x as u32, y as u32, Rgba(color));
            1
        }
        None => 0,
    };
    Recolored { image, changed }
}

/// Occurrences of one RGBA value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCount {
    pub rgba: [u8; 4],
    pub count: usize,
}

/// The `top_n` most frequent colours among visible pixels; ties ordered by colour value.
pub fn dominant_colors(rgba: &RgbaImage, top_n: usize) -> Vec<ColorCount> {
    let mut hist: HashMap<[u8; 4], usize> = HashMap::new();
    for p in rgba.pixels().filter(|p| p[3] > 0) {
        *hist.entry(p.0).or_default() += 1;
    }
    let mut counts: Vec<ColorCount> = hist
        .into_iter()
        .map(|(rgba, count)| ColorCount { rgba, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rgba.cmp(&b.rgba)));
    counts.truncate(top_n);
    counts
}

/// A configurable post-processing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectStep {
    Darken {
        #[serde(default = "default_darken_factor")]
        factor: f32,
    },
    Outline {
        #[serde(default = "default_outline_color")]
        color: [u8; 3],
    },
    RecolorDark {
        #[serde(default = "default_eye_region")]
        region: RelativeRegion,
        #[serde(default = "default_dark_threshold")]
        threshold: u8,
        #[serde(default = "default_mark_color")]
        color: [u8; 4],
    },
    MarkAnchor {
        #[serde(default = "default_anchor")]
        anchor: [f32; 2],
        #[serde(default = "default_search_radius")]
        radius: u32,
        #[serde(default = "default_mark_color")]
        color: [u8; 4],
    },
}

impl EffectStep {
    /// Applies the step to a frame whose visible content occupies `content`.
    pub fn apply(&self, frame: &RgbaImage, content: Rect) -> RgbaImage {
        match self {
            EffectStep::Darken { factor } => darken(frame, *factor),
            EffectStep::Outline { color } => outline(frame, *color),
            EffectStep::RecolorDark {
                region,
                threshold,
                color,
            } => recolor_dark(frame, region.resolve(content), *threshold, *color).image,
            EffectStep::MarkAnchor {
                anchor,
                radius,
                color,
            } => mark_anchor(frame, content, *anchor, *radius, *color).image,
        }
    }
}

/// Runs `steps` in order.
pub fn apply_effects(frame: RgbaImage, content: Rect, steps: &[EffectStep]) -> RgbaImage {
    steps
        .iter()
        .fold(frame, |img, step| step.apply(&img, content))
}

fn default_darken_factor() -> f32 {
    0.7
}
fn default_outline_color() -> [u8; 3] {
    [100, 100, 100]
}
fn default_eye_region() -> RelativeRegion {
    RelativeRegion::top_right(0.4)
}
fn default_dark_threshold() -> u8 {
    30
}
fn default_mark_color() -> [u8; 4] {
    [255, 0, 0, 255]
}
fn default_anchor() -> [f32; 2] {
    [0.85, 0.25]
}
fn default_search_radius() -> u32 {
    5
}
