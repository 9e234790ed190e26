use crate::error::{PfpError, PfpResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Default canvas edge length in pixels (the output is always square).
pub const DEFAULT_CANVAS_PX: u32 = 600;

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self::square(DEFAULT_CANVAS_PX)
    }
}

impl CanvasSize {
    /// A square canvas of `px` by `px` pixels.
    pub fn square(px: u32) -> Self {
        Self {
            width: px,
            height: px,
        }
    }

    /// Validate that the canvas is drawable by the CPU raster context.
    ///
    /// The raster surface addresses pixels with `u16` coordinates, so both
    /// dimensions must fit.
    pub fn validate(self) -> PfpResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PfpError::validation("canvas width/height must be > 0"));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(PfpError::validation(format!(
                "canvas {}x{} exceeds raster surface limit ({})",
                self.width,
                self.height,
                u16::MAX
            )));
        }
        Ok(())
    }

    /// Canvas midpoint in pixel coordinates.
    pub fn center(self) -> Point {
        Point::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}

/// Fit-to-canvas scale: `min(W/w, H/h)`.
///
/// Scaling an image of `img_w` by `img_h` by this factor makes it fit entirely
/// inside the canvas without cropping (letterbox/pillarbox, never crop/fill).
pub fn fit_scale(canvas: CanvasSize, img_w: u32, img_h: u32) -> PfpResult<f64> {
    if img_w == 0 || img_h == 0 {
        return Err(PfpError::validation("image width/height must be > 0"));
    }
    let sx = f64::from(canvas.width) / f64::from(img_w);
    let sy = f64::from(canvas.height) / f64::from(img_h);
    Ok(sx.min(sy))
}

/// Convert straight-alpha RGBA8 into premultiplied RGBA8 in place.
pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Convert premultiplied RGBA8 back to straight alpha in place.
pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}
