use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::{PfpError, PfpResult},
    model::{AvatarSpec, ImageResource},
};

pub mod decode;

/// Prepared raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// The image-load seam of the compositor.
///
/// Loading is the only suspension point in the pipeline; modeling it as a
/// fallible call gives every load an explicit completion/failure signal, so a
/// bad image can never stall a render.
pub trait ImageLoader {
    fn load(&mut self, resource: &ImageResource) -> PfpResult<PreparedImage>;
}

/// Filesystem-backed loader with a decode cache.
///
/// Relative sources resolve against `root`; `data:` sources decode inline.
pub struct FsImageStore {
    root: PathBuf,
    cache: HashMap<String, PreparedImage>,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    /// Eagerly warm the cache for everything `spec` references, in draw order.
    ///
    /// Failures are left for the render pass to report; prefetch only caches
    /// successes.
    pub fn prefetch(&mut self, spec: &AvatarSpec) {
        let background = spec.background.iter();
        let layers = spec.layers.iter().map(|l| &l.resource);
        for resource in background.chain(layers) {
            if resource.is_blank() {
                continue;
            }
            let _ = self.load(resource);
        }
    }

    fn read_bytes(&self, source: &str) -> PfpResult<Vec<u8>> {
        let norm = normalize_rel_path(source)?;
        let p = self.root.join(Path::new(&norm));
        std::fs::read(&p)
            .map_err(|e| PfpError::decode(format!("failed to read image '{}': {e}", p.display())))
    }
}

impl ImageLoader for FsImageStore {
    fn load(&mut self, resource: &ImageResource) -> PfpResult<PreparedImage> {
        if resource.is_blank() {
            return Err(PfpError::validation(
                "blank sentinel resource is never loaded",
            ));
        }
        if let Some(img) = self.cache.get(&resource.source) {
            return Ok(img.clone());
        }

        let bytes = if resource.is_data_uri() {
            decode::decode_data_uri(&resource.source)?
        } else {
            self.read_bytes(&resource.source)?
        };
        let img = decode::decode_image(&bytes)?;
        self.cache.insert(resource.source.clone(), img.clone());
        Ok(img)
    }
}

/// In-memory loader keyed by resource source, for tests and embedding.
#[derive(Default)]
pub struct MemoryImageStore {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register encoded image bytes (PNG etc.) under a source identifier.
    pub fn insert(&mut self, source: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(source.into(), bytes);
    }
}

impl ImageLoader for MemoryImageStore {
    fn load(&mut self, resource: &ImageResource) -> PfpResult<PreparedImage> {
        if resource.is_blank() {
            return Err(PfpError::validation(
                "blank sentinel resource is never loaded",
            ));
        }
        if resource.is_data_uri() {
            let bytes = decode::decode_data_uri(&resource.source)?;
            return decode::decode_image(&bytes);
        }
        let bytes = self
            .images
            .get(&resource.source)
            .ok_or_else(|| PfpError::decode(format!("unknown image '{}'", resource.source)))?;
        decode::decode_image(bytes)
    }
}

/// Normalize and validate store-relative image paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and
/// rejects absolute paths or parent traversals (`..`).
pub(crate) fn normalize_rel_path(source: &str) -> PfpResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(PfpError::validation("image paths must be relative"));
    }
    if s.is_empty() {
        return Err(PfpError::validation("image path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(PfpError::validation("image paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(PfpError::validation("image path must contain a file name"));
    }

    Ok(out.join("/"))
}
