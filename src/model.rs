use crate::{
    core::CanvasSize,
    error::{PfpError, PfpResult},
};

/// Source string of the shared "no image" sentinel.
pub const BLANK_SOURCE: &str = "layers/blank.png";

/// Horizontal/vertical offset bounds in canvas pixels.
pub const OFFSET_RANGE: (f64, f64) = (-100.0, 100.0);
/// Uniform layer scale bounds (multiplier on the fit-to-canvas scale).
pub const SCALE_RANGE: (f64, f64) = (0.1, 2.0);
/// Rotation bounds in degrees.
pub const ROTATION_RANGE: (f64, f64) = (-180.0, 180.0);
/// Caption font size bounds in pixels.
pub const FONT_SIZE_RANGE: (f64, f64) = (4.0, 200.0);
/// Caption vertical position bounds in percent of canvas height.
pub const VERTICAL_POSITION_RANGE: (f64, f64) = (0.0, 100.0);

/// A selectable image: a stable identifier (relative path or data URI) plus a
/// display label. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageResource {
    pub source: String,
    pub label: String,
}

impl ImageResource {
    pub fn new(source: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            label: label.into(),
        }
    }

    /// The shared blank sentinel. A layer holding it draws nothing.
    pub fn blank() -> Self {
        Self::new(BLANK_SOURCE, "Blank")
    }

    pub fn is_blank(&self) -> bool {
        self.source == BLANK_SOURCE
    }

    pub fn is_data_uri(&self) -> bool {
        self.source.starts_with("data:")
    }
}

/// Fixed, ordered layer categories. Sequence order is draw (z-) order: later
/// categories are drawn on top of earlier ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LayerCategory {
    Base,
    Clothes,
    Hat,
    Accessory1,
    Accessory2,
}

impl LayerCategory {
    pub const ALL: [LayerCategory; 5] = [
        LayerCategory::Base,
        LayerCategory::Clothes,
        LayerCategory::Hat,
        LayerCategory::Accessory1,
        LayerCategory::Accessory2,
    ];

    /// Number of layer slots.
    pub const COUNT: usize = Self::ALL.len();

    /// Slot index of this category in draw order.
    pub fn index(self) -> usize {
        match self {
            LayerCategory::Base => 0,
            LayerCategory::Clothes => 1,
            LayerCategory::Hat => 2,
            LayerCategory::Accessory1 => 3,
            LayerCategory::Accessory2 => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LayerCategory::Base => "Base",
            LayerCategory::Clothes => "Clothes",
            LayerCategory::Hat => "Hat",
            LayerCategory::Accessory1 => "Accessory 1",
            LayerCategory::Accessory2 => "Accessory 2",
        }
    }
}

/// Per-layer 2D transform applied on top of the fit-to-canvas base scale.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerTransform {
    /// Horizontal offset from canvas center, pixels.
    pub offset_x: f64,
    /// Vertical offset from canvas center, pixels.
    pub offset_y: f64,
    /// Uniform scale multiplier.
    pub scale: f64,
    /// Rotation about the layer position, degrees.
    pub rotation_deg: f64,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
            rotation_deg: 0.0,
        }
    }
}

impl LayerTransform {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Return a copy with every parameter clamped into its declared bounds.
    ///
    /// Non-finite values collapse to the identity value for that parameter.
    pub fn clamped(&self) -> Self {
        Self {
            offset_x: clamp_or(self.offset_x, OFFSET_RANGE, 0.0),
            offset_y: clamp_or(self.offset_y, OFFSET_RANGE, 0.0),
            scale: clamp_or(self.scale, SCALE_RANGE, 1.0),
            rotation_deg: clamp_or(self.rotation_deg, ROTATION_RANGE, 0.0),
        }
    }

    pub fn validate(&self) -> PfpResult<()> {
        check_range("offset_x", self.offset_x, OFFSET_RANGE)?;
        check_range("offset_y", self.offset_y, OFFSET_RANGE)?;
        check_range("scale", self.scale, SCALE_RANGE)?;
        check_range("rotation_deg", self.rotation_deg, ROTATION_RANGE)?;
        Ok(())
    }
}

/// One fixed-order compositing slot: the selected resource plus its transform.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    pub resource: ImageResource,
    #[serde(default)]
    pub transform: LayerTransform,
}

impl Layer {
    pub fn blank() -> Self {
        Self {
            resource: ImageResource::blank(),
            transform: LayerTransform::default(),
        }
    }
}

/// Caption text with styling.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Caption {
    pub text: String,
    #[serde(default)]
    pub style: CaptionStyle,
}

/// Caption band styling. The caption is always horizontally centered; only the
/// vertical band position is adjustable.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CaptionStyle {
    /// Font size in pixels.
    pub font_size_px: f64,
    /// Vertical band center as a percentage of canvas height, `[0, 100]`.
    pub vertical_position_pct: f64,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size_px: 20.0,
            vertical_position_pct: 70.0,
        }
    }
}

impl CaptionStyle {
    /// Band height derived from the font size.
    pub fn band_height(&self) -> f64 {
        self.font_size_px * 1.5
    }

    pub fn clamped(&self) -> Self {
        Self {
            font_size_px: clamp_or(self.font_size_px, FONT_SIZE_RANGE, 20.0),
            vertical_position_pct: clamp_or(
                self.vertical_position_pct,
                VERTICAL_POSITION_RANGE,
                70.0,
            ),
        }
    }

    pub fn validate(&self) -> PfpResult<()> {
        check_range("font_size_px", self.font_size_px, FONT_SIZE_RANGE)?;
        check_range(
            "vertical_position_pct",
            self.vertical_position_pct,
            VERTICAL_POSITION_RANGE,
        )?;
        Ok(())
    }
}

/// Complete avatar state: everything the compositor needs to produce a frame.
///
/// This is the explicit state object passed to every render; there is no
/// ambient mutable state anywhere in the crate.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AvatarSpec {
    #[serde(default)]
    pub canvas: CanvasSize,
    /// Optional full-canvas background image, drawn before any layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<ImageResource>,
    /// Exactly [`LayerCategory::COUNT`] slots in draw order.
    pub layers: Vec<Layer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<Caption>,
}

impl AvatarSpec {
    /// Fresh session state: the given base resource, every other slot blank,
    /// no background, no caption.
    pub fn new(base: ImageResource) -> Self {
        let mut spec = Self::empty();
        spec.layers[LayerCategory::Base.index()].resource = base;
        spec
    }

    /// State with every slot blank. Rendering it yields a plain white square.
    pub fn empty() -> Self {
        Self {
            canvas: CanvasSize::default(),
            background: None,
            layers: vec![Layer::blank(); LayerCategory::COUNT],
            caption: None,
        }
    }

    pub fn layer(&self, category: LayerCategory) -> &Layer {
        &self.layers[category.index()]
    }

    pub fn layer_mut(&mut self, category: LayerCategory) -> &mut Layer {
        &mut self.layers[category.index()]
    }

    pub fn validate(&self) -> PfpResult<()> {
        self.canvas.validate()?;

        if self.layers.len() != LayerCategory::COUNT {
            return Err(PfpError::validation(format!(
                "expected {} layers, got {}",
                LayerCategory::COUNT,
                self.layers.len()
            )));
        }
        for (category, layer) in LayerCategory::ALL.iter().zip(&self.layers) {
            if layer.resource.source.is_empty() {
                return Err(PfpError::validation(format!(
                    "{} layer has an empty resource source",
                    category.label()
                )));
            }
            layer.transform.validate().map_err(|e| {
                PfpError::validation(format!("{} layer: {e}", category.label()))
            })?;
        }

        if let Some(caption) = &self.caption {
            caption.style.validate()?;
        }
        Ok(())
    }
}

fn clamp_or(v: f64, range: (f64, f64), fallback: f64) -> f64 {
    if v.is_finite() {
        v.clamp(range.0, range.1)
    } else {
        fallback
    }
}

fn check_range(name: &str, v: f64, range: (f64, f64)) -> PfpResult<()> {
    if !v.is_finite() || v < range.0 || v > range.1 {
        return Err(PfpError::validation(format!(
            "{name} must be within [{}, {}], got {v}",
            range.0, range.1
        )));
    }
    Ok(())
}
