//! pfpgen composites layered avatar images into a square PNG.
//!
//! The public API is session-oriented:
//!
//! - Build an [`AvatarSpec`] (usually starting from [`Catalog::builtin`])
//! - Mutate it through a [`RenderSession`] (selections, sliders, caption)
//! - Render with a [`Compositor`] and export with [`export_png`]
#![forbid(unsafe_code)]

pub mod assets;
pub mod catalog;
pub mod compositor;
pub mod core;
pub mod error;
pub mod export;
pub mod model;
pub mod session;

mod text;

pub use crate::assets::{FsImageStore, ImageLoader, MemoryImageStore, PreparedImage};
pub use crate::catalog::Catalog;
pub use crate::compositor::{CanvasRgba, Compositor};
pub use crate::core::{CanvasSize, DEFAULT_CANVAS_PX, fit_scale};
pub use crate::error::{PfpError, PfpResult};
pub use crate::export::{DEFAULT_EXPORT_FILENAME, encode_png, export_png, write_png};
pub use crate::model::{
    AvatarSpec, Caption, CaptionStyle, ImageResource, Layer, LayerCategory, LayerTransform,
};
pub use crate::session::{RenderRequest, RenderSession};
