use std::sync::Arc;

use crate::{
    assets::{ImageLoader, PreparedImage},
    core::{Affine, CanvasSize, fit_scale},
    error::{PfpError, PfpResult},
    model::{AvatarSpec, Caption, LayerCategory, LayerTransform},
    text::TextLayoutEngine,
};

/// A rendered canvas as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**; the flag makes this explicit at API
/// boundaries.
#[derive(Clone, Debug)]
pub struct CanvasRgba {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl CanvasRgba {
    /// Premultiplied RGBA8 of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

struct CaptionFont {
    bytes: Vec<u8>,
    data: vello_cpu::peniko::FontData,
}

/// Deterministic layered-avatar renderer backed by `vello_cpu`.
///
/// The compositor holds no avatar state; every call to [`Compositor::render`]
/// draws the full [`AvatarSpec`] it is given, in fixed order: white fill,
/// optional background, the five layers, then the caption band.
pub struct Compositor {
    ctx: Option<vello_cpu::RenderContext>,
    text_engine: TextLayoutEngine,
    font: Option<CaptionFont>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            ctx: None,
            text_engine: TextLayoutEngine::new(),
            font: None,
        }
    }

    /// Configure the font used to shape caption text.
    ///
    /// Without a font the caption band still renders; the glyphs are skipped
    /// with a warning.
    pub fn set_font_bytes(&mut self, bytes: Vec<u8>) {
        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.clone()),
            0,
        );
        self.font = Some(CaptionFont { bytes, data });
    }

    /// Render `spec` into a fresh frame.
    ///
    /// Image loads run as a strictly sequential loop over background plus
    /// layers, so draw order always matches slot order regardless of load
    /// latency. A failed load is reported and that contribution skipped; it
    /// never aborts the rest of the frame.
    #[tracing::instrument(skip_all, fields(w = spec.canvas.width, h = spec.canvas.height))]
    pub fn render(
        &mut self,
        spec: &AvatarSpec,
        images: &mut dyn ImageLoader,
    ) -> PfpResult<CanvasRgba> {
        spec.validate()?;

        let canvas = spec.canvas;
        // validate() guarantees both fit u16.
        let width = canvas.width as u16;
        let height = canvas.height as u16;

        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        self.with_ctx_mut(width, height, |this, ctx| {
            // Opaque white default background.
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(canvas.width),
                f64::from(canvas.height),
            ));

            // Custom background, fit to canvas, no user transform.
            if let Some(background) = &spec.background {
                match images.load(background) {
                    Ok(img) => {
                        draw_fitted(ctx, canvas, &img, &LayerTransform::default())?;
                    }
                    Err(e) => tracing::warn!(
                        source = %background.source,
                        error = %e,
                        "background load failed; skipping"
                    ),
                }
            }

            // Layers in fixed category order; blanks contribute nothing.
            for (category, layer) in LayerCategory::ALL.iter().zip(&spec.layers) {
                if layer.resource.is_blank() {
                    continue;
                }
                match images.load(&layer.resource) {
                    Ok(img) => draw_fitted(ctx, canvas, &img, &layer.transform)?,
                    Err(e) => tracing::warn!(
                        layer = category.label(),
                        source = %layer.resource.source,
                        error = %e,
                        "layer load failed; skipping"
                    ),
                }
            }

            // Caption band last, on top of everything.
            if let Some(caption) = &spec.caption
                && !caption.text.is_empty()
            {
                this.draw_caption(ctx, canvas, caption)?;
            }

            ctx.flush();
            ctx.render_to_pixmap(&mut pixmap);
            Ok(())
        })?;

        Ok(CanvasRgba {
            width: canvas.width,
            height: canvas.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut Self, &mut vello_cpu::RenderContext) -> PfpResult<R>,
    ) -> PfpResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(self, &mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    fn draw_caption(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: CanvasSize,
        caption: &Caption,
    ) -> PfpResult<()> {
        let style = &caption.style;
        let band_height = style.band_height();
        let band_center_y = f64::from(canvas.height) * style.vertical_position_pct / 100.0;
        let band_top = band_center_y - band_height / 2.0;

        // 50%-alpha black band behind the text.
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, 128));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            band_top,
            f64::from(canvas.width),
            band_top + band_height,
        ));

        let Some(font) = &self.font else {
            tracing::warn!("caption font not configured; rendering band without text");
            return Ok(());
        };

        let layout = match self.text_engine.layout_caption(
            &caption.text,
            &font.bytes,
            style.font_size_px as f32,
        ) {
            Ok(layout) => layout,
            Err(e) => {
                tracing::warn!(error = %e, "caption shaping failed; rendering band without text");
                return Ok(());
            }
        };

        // Centered horizontally on the canvas, vertically within the band.
        let origin_x = f64::from(canvas.width) / 2.0 - f64::from(layout.full_width()) / 2.0;
        let origin_y = band_center_y - f64::from(layout.height()) / 2.0;
        ctx.set_transform(affine_to_cpu(Affine::translate((origin_x, origin_y))));

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        Ok(())
    }
}

/// Affine placing an image on the canvas: translate to the layer position,
/// rotate, scale by `fit_scale * layer.scale`, then draw the image centered on
/// its own bounding box.
pub(crate) fn layer_affine(
    canvas: CanvasSize,
    img_w: u32,
    img_h: u32,
    transform: &LayerTransform,
) -> PfpResult<Affine> {
    let fit = fit_scale(canvas, img_w, img_h)?;
    let center = canvas.center();
    Ok(
        Affine::translate((center.x + transform.offset_x, center.y + transform.offset_y))
            * Affine::rotate(transform.rotation_deg.to_radians())
            * Affine::scale(fit * transform.scale)
            * Affine::translate((-f64::from(img_w) / 2.0, -f64::from(img_h) / 2.0)),
    )
}

fn draw_fitted(
    ctx: &mut vello_cpu::RenderContext,
    canvas: CanvasSize,
    img: &PreparedImage,
    transform: &LayerTransform,
) -> PfpResult<()> {
    let tr = layer_affine(canvas, img.width, img.height, transform)?;
    let paint = rgba_premul_to_image(&img.rgba8_premul, img.width, img.height)?;

    ctx.set_transform(affine_to_cpu(tr));
    ctx.set_paint(paint);
    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
        0.0,
        0.0,
        f64::from(img.width),
        f64::from(img.height),
    ));
    Ok(())
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> PfpResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| PfpError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| PfpError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(PfpError::render("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

fn rgba_premul_to_image(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> PfpResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point;

    #[test]
    fn layer_affine_maps_image_center_to_offset_canvas_center() {
        let canvas = CanvasSize::square(600);
        let t = LayerTransform {
            offset_x: 40.0,
            offset_y: -25.0,
            scale: 1.3,
            rotation_deg: 90.0,
        };
        let tr = layer_affine(canvas, 128, 64, &t).unwrap();
        let mapped = tr * Point::new(64.0, 32.0);
        assert!((mapped.x - 340.0).abs() < 1e-9);
        assert!((mapped.y - 275.0).abs() < 1e-9);
    }

    #[test]
    fn layer_affine_at_identity_keeps_image_inside_canvas() {
        let canvas = CanvasSize::square(600);
        // Wide image: fit scale is 600/300 = 2, scaled size 600x200.
        let tr = layer_affine(canvas, 300, 100, &LayerTransform::default()).unwrap();
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(300.0, 0.0),
            Point::new(0.0, 100.0),
            Point::new(300.0, 100.0),
        ];
        for c in corners {
            let p = tr * c;
            assert!((0.0..=600.0).contains(&p.x), "x out of bounds: {p:?}");
            assert!((0.0..=600.0).contains(&p.y), "y out of bounds: {p:?}");
        }
        // And the scaled bounding box spans the full fitted extent.
        let top_left = tr * Point::new(0.0, 0.0);
        let bottom_right = tr * Point::new(300.0, 100.0);
        assert!((top_left.x - 0.0).abs() < 1e-9);
        assert!((top_left.y - 200.0).abs() < 1e-9);
        assert!((bottom_right.x - 600.0).abs() < 1e-9);
        assert!((bottom_right.y - 400.0).abs() < 1e-9);
    }

    #[test]
    fn pixmap_from_premul_bytes_checks_len() {
        assert!(pixmap_from_premul_bytes(&[0u8; 4], 1, 1).is_ok());
        assert!(pixmap_from_premul_bytes(&[0u8; 3], 1, 1).is_err());
        assert!(pixmap_from_premul_bytes(&[0u8; 8], 1, 1).is_err());
    }
}
