use crate::compositing::blit_rgba;
use crate::error::{Result, SlicerError};
use crate::model::Rect;
use image::RgbaImage;

/// A frame centered on its output canvas.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub rgba: RgbaImage,
    /// Where the content landed on the canvas.
    pub placed: Rect,
}

/// Offset that centers `content` on `canvas` along one axis: `(canvas - content) / 2`, floored.
pub fn center_offset(content: u32, canvas: u32) -> u32 {
    canvas.saturating_sub(content) / 2
}

/// Pastes `content` centered on a transparent `canvas_size x canvas_size` canvas.
///
/// No scaling is ever applied; content larger than the canvas on either axis is an error.
pub fn normalize(content: &RgbaImage, canvas_size: u32) -> Result<Normalized> {
    let (cw, ch) = content.dimensions();
    if cw > canvas_size || ch > canvas_size {
        return Err(SlicerError::ContentExceedsCanvas {
            width: cw,
            height: ch,
            canvas: canvas_size,
        });
    }
    let ox = center_offset(cw, canvas_size);
    let oy = center_offset(ch, canvas_size);
    let mut canvas = RgbaImage::new(canvas_size, canvas_size);
    blit_rgba(content, &mut canvas, ox, oy, Rect::new(0, 0, cw, ch));
    Ok(Normalized {
        rgba: canvas,
        placed: Rect::from_size(ox, oy, cw, ch),
    })
}
