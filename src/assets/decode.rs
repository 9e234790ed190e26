use std::sync::Arc;

use anyhow::Context as _;
use base64::Engine as _;

use crate::{
    assets::PreparedImage,
    core::premultiply_rgba8_in_place,
    error::{PfpError, PfpResult},
};

/// Decode encoded image bytes into premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> PfpResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Extract the payload bytes of a `data:<mime>;base64,<payload>` URI.
///
/// This is the embeddable representation uploaded backgrounds arrive in.
pub fn decode_data_uri(source: &str) -> PfpResult<Vec<u8>> {
    let rest = source
        .strip_prefix("data:")
        .ok_or_else(|| PfpError::decode("data URI must start with 'data:'"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| PfpError::decode("data URI has no ',' separator"))?;
    if !meta.ends_with(";base64") {
        return Err(PfpError::decode("only base64 data URIs are supported"));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| PfpError::decode(format!("invalid base64 payload: {e}")))
}
