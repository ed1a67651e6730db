use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;

use crate::foundation::error::{StageError, StageResult};

/// A decoded image ready for any backend.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    /// URL the resource was loaded from (the cache key).
    pub url: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Fetches and decodes resources for the asset cache.
///
/// `load` may be called from prefetch worker threads. `release` is called exactly once per
/// successfully loaded resource, when the owning cache is disposed.
pub trait ResourceLoader: Send + Sync {
    /// Fetch and decode `url`.
    fn load(&self, url: &str) -> StageResult<Resource>;

    /// Free anything held outside the returned [`Resource`].
    fn release(&self, _resource: &Resource) {}
}

/// Loader reading images from the local filesystem.
///
/// Accepts `file://` URLs, absolute paths, and paths relative to `root`.
#[derive(Clone, Debug)]
pub struct FileLoader {
    root: PathBuf,
}

impl FileLoader {
    /// Loader resolving relative paths against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory for relative paths.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, url: &str) -> StageResult<PathBuf> {
        if let Some(rest) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(rest));
        }
        if url.contains("://") {
            return Err(StageError::asset_load(format!(
                "unsupported url scheme in '{url}'"
            )));
        }
        if Path::new(url).is_absolute() {
            return Ok(PathBuf::from(url));
        }
        Ok(self.root.join(normalize_rel_path(url)?))
    }
}

impl ResourceLoader for FileLoader {
    fn load(&self, url: &str) -> StageResult<Resource> {
        let path = self.path_for(url)?;
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read image '{}'", path.display()))
            .map_err(|e| StageError::asset_load(format!("{e:#}")))?;
        decode_image(url, &bytes)
    }
}

/// Normalize a relative asset path, rejecting escapes out of the root.
pub(crate) fn normalize_rel_path(source: &str) -> StageResult<String> {
    let s = source.replace('\\', "/");
    if s.is_empty() {
        return Err(StageError::asset_load("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(StageError::asset_load(format!(
                "asset path '{source}' must not contain '..'"
            )));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(StageError::asset_load(format!(
            "asset path '{source}' must contain a file name"
        )));
    }
    Ok(out.join("/"))
}

/// Decode PNG/JPEG bytes into a premultiplied [`Resource`].
pub fn decode_image(url: &str, bytes: &[u8]) -> StageResult<Resource> {
    let img = image::load_from_memory(bytes)
        .with_context(|| format!("decode image '{url}'"))
        .map_err(|e| StageError::asset_load(format!("{e:#}")))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(Resource {
        url: url.to_owned(),
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
