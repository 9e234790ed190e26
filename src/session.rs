use crate::{
    assets::ImageLoader,
    compositor::{CanvasRgba, Compositor},
    error::{PfpError, PfpResult},
    model::{AvatarSpec, Caption, CaptionStyle, ImageResource, LayerCategory},
};

/// An immutable snapshot of session state, tagged with the generation it was
/// taken at. Rendering works off snapshots so that in-flight work can be
/// recognized as stale when it finishes.
#[derive(Clone, Debug)]
pub struct RenderRequest {
    pub generation: u64,
    pub spec: AvatarSpec,
}

/// Session-scoped avatar state with a stale-render guard.
///
/// Every mutation is a synchronous state replacement (clamped to bounds) that
/// bumps the generation counter. A frame rendered from an older snapshot is
/// rejected at commit time, so the displayed canvas always reflects the
/// last-committed state and never a mix of old and new layers.
pub struct RenderSession {
    spec: AvatarSpec,
    compositor: Compositor,
    generation: u64,
    committed: Option<(u64, CanvasRgba)>,
}

impl RenderSession {
    pub fn new(spec: AvatarSpec) -> PfpResult<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            compositor: Compositor::new(),
            generation: 0,
            committed: None,
        })
    }

    pub fn spec(&self) -> &AvatarSpec {
        &self.spec
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The last frame accepted by [`RenderSession::commit`], if any.
    pub fn last_frame(&self) -> Option<&CanvasRgba> {
        self.committed.as_ref().map(|(_, frame)| frame)
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    /// Select `resource` for a layer slot.
    ///
    /// The base slot refuses the blank sentinel; every other slot accepts it
    /// to clear the selection.
    pub fn select_resource(
        &mut self,
        category: LayerCategory,
        resource: ImageResource,
    ) -> PfpResult<()> {
        if category == LayerCategory::Base && resource.is_blank() {
            return Err(PfpError::validation("base layer must not be blank"));
        }
        self.spec.layer_mut(category).resource = resource;
        self.bump();
        Ok(())
    }

    pub fn set_offset_x(&mut self, category: LayerCategory, value: f64) -> PfpResult<()> {
        self.mutate_transform(category, |t| t.offset_x = value)
    }

    pub fn set_offset_y(&mut self, category: LayerCategory, value: f64) -> PfpResult<()> {
        self.mutate_transform(category, |t| t.offset_y = value)
    }

    pub fn set_scale(&mut self, category: LayerCategory, value: f64) -> PfpResult<()> {
        self.mutate_transform(category, |t| t.scale = value)
    }

    pub fn set_rotation(&mut self, category: LayerCategory, value: f64) -> PfpResult<()> {
        self.mutate_transform(category, |t| t.rotation_deg = value)
    }

    /// Install or clear the uploaded background.
    pub fn set_background(&mut self, background: Option<ImageResource>) {
        self.spec.background = background;
        self.bump();
    }

    /// Replace the caption text; empty text clears the caption.
    pub fn set_caption_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            self.spec.caption = None;
        } else {
            let style = self
                .spec
                .caption
                .as_ref()
                .map(|c| c.style)
                .unwrap_or_default();
            self.spec.caption = Some(Caption { text, style });
        }
        self.bump();
    }

    /// Replace the caption style, clamped to bounds. Applies to the current
    /// caption or is stored for the next one.
    pub fn set_caption_style(&mut self, style: CaptionStyle) {
        let style = style.clamped();
        match &mut self.spec.caption {
            Some(caption) => caption.style = style,
            None => {
                self.spec.caption = Some(Caption {
                    text: String::new(),
                    style,
                });
            }
        }
        self.bump();
    }

    /// Snapshot the current state for rendering.
    pub fn snapshot(&self) -> RenderRequest {
        RenderRequest {
            generation: self.generation,
            spec: self.spec.clone(),
        }
    }

    /// Render a snapshot. Pure with respect to session state; commit decides
    /// whether the result is still current.
    pub fn render(
        &mut self,
        request: &RenderRequest,
        images: &mut dyn ImageLoader,
    ) -> PfpResult<CanvasRgba> {
        self.compositor.render(&request.spec, images)
    }

    /// Accept `frame` as the displayed canvas iff it was rendered from the
    /// current generation. Returns `false` when the frame is stale (a newer
    /// mutation superseded it) and was dropped.
    pub fn commit(&mut self, generation: u64, frame: CanvasRgba) -> bool {
        if generation != self.generation {
            tracing::debug!(
                rendered = generation,
                current = self.generation,
                "dropping stale frame"
            );
            return false;
        }
        self.committed = Some((generation, frame));
        true
    }

    /// Render from the latest state and commit the result.
    pub fn render_latest(&mut self, images: &mut dyn ImageLoader) -> PfpResult<&CanvasRgba> {
        let request = self.snapshot();
        let frame = self.render(&request, images)?;
        // Single-threaded: no mutation can interleave between snapshot and
        // commit, so this commit always succeeds.
        self.commit(request.generation, frame);
        self.last_frame()
            .ok_or_else(|| PfpError::render("committed frame missing"))
    }

    fn mutate_transform(
        &mut self,
        category: LayerCategory,
        f: impl FnOnce(&mut crate::model::LayerTransform),
    ) -> PfpResult<()> {
        // UI policy: the base layer is always drawn at identity.
        if category == LayerCategory::Base {
            return Err(PfpError::validation(
                "base layer transform is fixed at identity",
            ));
        }
        let transform = &mut self.spec.layer_mut(category).transform;
        f(transform);
        *transform = transform.clamped();
        self.bump();
        Ok(())
    }

    fn bump(&mut self) {
        self.generation += 1;
    }
}
