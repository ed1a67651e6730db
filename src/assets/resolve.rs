use std::collections::{BTreeMap, HashMap};

use crate::{
    foundation::error::{StageError, StageResult},
    scene::normalize::ImageRef,
};

/// External lookup from logical image id to URL.
pub trait ImageRegistry: Send + Sync {
    /// URL registered for `id`.
    fn url_for(&self, id: &str) -> Option<String>;
}

impl ImageRegistry for HashMap<String, String> {
    fn url_for(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

impl ImageRegistry for BTreeMap<String, String> {
    fn url_for(&self, id: &str) -> Option<String> {
        self.get(id).cloned()
    }
}

/// External manifest remapping bundled-asset paths to their published URLs.
pub trait AssetManifest: Send + Sync {
    /// Return `true` when `src` names a bundled asset that must be remapped.
    fn is_bundled(&self, src: &str) -> bool;

    /// Published URL of a bundled asset.
    fn remap(&self, src: &str) -> Option<String>;
}

/// In-memory manifest: any source starting with one of `prefixes` is bundled.
#[derive(Clone, Debug, Default)]
pub struct StaticManifest {
    prefixes: Vec<String>,
    entries: BTreeMap<String, String>,
}

impl StaticManifest {
    /// Manifest treating `prefixes` as bundled-asset roots.
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            entries: BTreeMap::new(),
        }
    }

    /// Add a mapping from a bundled path to its URL.
    pub fn with_entry(mut self, src: impl Into<String>, url: impl Into<String>) -> Self {
        self.entries.insert(src.into(), url.into());
        self
    }
}

impl AssetManifest for StaticManifest {
    fn is_bundled(&self, src: &str) -> bool {
        self.prefixes.iter().any(|p| src.starts_with(p.as_str()))
    }

    fn remap(&self, src: &str) -> Option<String> {
        self.entries.get(src).cloned()
    }
}

/// Maps layer image references to concrete resource URLs.
#[derive(Default)]
pub struct AssetResolver {
    registry: Option<Box<dyn ImageRegistry>>,
    manifest: Option<Box<dyn AssetManifest>>,
}

impl std::fmt::Debug for AssetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetResolver")
            .field("registry", &self.registry.is_some())
            .field("manifest", &self.manifest.is_some())
            .finish()
    }
}

impl AssetResolver {
    /// Resolver that passes direct sources through and knows no registry ids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an image registry.
    pub fn with_registry(mut self, registry: impl ImageRegistry + 'static) -> Self {
        self.registry = Some(Box::new(registry));
        self
    }

    /// Attach a bundled-asset manifest.
    pub fn with_manifest(mut self, manifest: impl AssetManifest + 'static) -> Self {
        self.manifest = Some(Box::new(manifest));
        self
    }

    /// Final URL for `image`.
    ///
    /// Registry ids are looked up first, then the result (or a direct source) goes through the
    /// manifest when it names a bundled asset.
    pub fn resolve(&self, image: &ImageRef) -> StageResult<String> {
        let src = match image {
            ImageRef::Source(src) => src.clone(),
            ImageRef::Registry(id) => self
                .registry
                .as_ref()
                .and_then(|r| r.url_for(id))
                .ok_or_else(|| {
                    StageError::asset_resolution(format!("image id '{id}' is not registered"))
                })?,
            ImageRef::None => {
                return Err(StageError::asset_resolution("layer has no image reference"));
            }
        };

        let url = match &self.manifest {
            Some(m) if m.is_bundled(&src) => m.remap(&src).ok_or_else(|| {
                StageError::asset_resolution(format!("bundled asset '{src}' missing from manifest"))
            })?,
            _ => src,
        };

        if url.trim().is_empty() {
            return Err(StageError::asset_resolution("resolved url is empty"));
        }
        Ok(url)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/resolve.rs"]
mod tests;
