use std::{io::Cursor, path::Path};

use anyhow::Context as _;

use crate::{
    assets::ImageLoader,
    compositor::{CanvasRgba, Compositor},
    core::unpremultiply_rgba8_in_place,
    error::{PfpError, PfpResult},
    model::AvatarSpec,
};

/// Default filename offered for exported avatars.
pub const DEFAULT_EXPORT_FILENAME: &str = "pfp.png";

/// Render `spec` to completion and encode the frame as PNG bytes.
///
/// The compositor's sequential load-then-draw loop finishes every background
/// and layer load before returning, so the encode always sees a fully
/// rendered frame, never a progressive one.
pub fn export_png(
    compositor: &mut Compositor,
    spec: &AvatarSpec,
    images: &mut dyn ImageLoader,
) -> PfpResult<Vec<u8>> {
    let frame = compositor.render(spec, images)?;
    encode_png(&frame)
}

/// Encode a rendered frame as PNG bytes.
pub fn encode_png(frame: &CanvasRgba) -> PfpResult<Vec<u8>> {
    let mut data = frame.data.clone();
    if frame.premultiplied {
        unpremultiply_rgba8_in_place(&mut data);
    }

    let img = image::RgbaImage::from_raw(frame.width, frame.height, data)
        .ok_or_else(|| PfpError::encode("frame buffer does not match dimensions"))?;

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .context("encode png")?;
    Ok(out)
}

/// Write PNG bytes to `path`, creating parent directories.
pub fn write_png(path: impl AsRef<Path>, png: &[u8]) -> PfpResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, png).with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}
