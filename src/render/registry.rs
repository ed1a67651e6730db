use std::{
    collections::BTreeMap,
    sync::{Arc, OnceLock},
};

use crate::{
    foundation::error::{StageError, StageResult},
    render::adapter::{AdapterSettings, CanvasAdapter},
    render::canvas2d::Canvas2dAdapter,
    render::gl::GlAdapter,
    render::scene3d::Scene3dAdapter,
};

/// Builds a fresh adapter instance.
pub type AdapterFactory =
    Arc<dyn Fn(&AdapterSettings) -> StageResult<Box<dyn CanvasAdapter>> + Send + Sync>;

/// Lookup table from backend key to adapter factory.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("keys", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AdapterRegistry {
    /// Registry with no backends.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding `canvas2d`, `scene3d` and `gl`.
    pub fn with_builtin() -> Self {
        let mut r = Self::empty();
        let builtin: [(&str, AdapterFactory); 3] = [
            (Canvas2dAdapter::KEY, Arc::new(create_canvas2d)),
            (Scene3dAdapter::KEY, Arc::new(create_scene3d)),
            (GlAdapter::KEY, Arc::new(create_gl)),
        ];
        for (key, factory) in builtin {
            r.factories.insert(key.to_owned(), factory);
        }
        r
    }

    /// Add a backend. Keys are unique.
    pub fn register(&mut self, key: impl Into<String>, factory: AdapterFactory) -> StageResult<()> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(StageError::validation("backend key must be non-empty"));
        }
        if self.factories.contains_key(&key) {
            return Err(StageError::validation(format!(
                "backend '{key}' is already registered"
            )));
        }
        self.factories.insert(key, factory);
        Ok(())
    }

    /// Instantiate the backend registered under `key`.
    pub fn create(
        &self,
        key: &str,
        settings: &AdapterSettings,
    ) -> StageResult<Box<dyn CanvasAdapter>> {
        let factory = self.factories.get(key).ok_or_else(|| {
            StageError::render_backend(format!(
                "unknown backend '{key}' (available: {})",
                self.keys().collect::<Vec<_>>().join(", ")
            ))
        })?;
        factory(settings)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Return `true` when `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }
}

fn create_canvas2d(settings: &AdapterSettings) -> StageResult<Box<dyn CanvasAdapter>> {
    Ok(Box::new(Canvas2dAdapter::new(settings.clone())))
}

fn create_scene3d(settings: &AdapterSettings) -> StageResult<Box<dyn CanvasAdapter>> {
    Ok(Box::new(Scene3dAdapter::new(settings.clone())))
}

fn create_gl(settings: &AdapterSettings) -> StageResult<Box<dyn CanvasAdapter>> {
    Ok(Box::new(GlAdapter::new(settings.clone())))
}

static GLOBAL: OnceLock<Arc<AdapterRegistry>> = OnceLock::new();

/// Install the process-wide registry. Only the first call wins; later calls return `Err` with
/// the rejected registry.
pub fn install_global(registry: AdapterRegistry) -> Result<(), AdapterRegistry> {
    GLOBAL
        .set(Arc::new(registry))
        .map_err(|r| Arc::try_unwrap(r).unwrap_or_else(|r| (*r).clone()))
}

/// Process-wide registry; the built-ins unless [`install_global`] ran first.
pub fn global() -> Arc<AdapterRegistry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(AdapterRegistry::with_builtin())))
}

/// Device capability hint used for automatic backend selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    /// Hardware-accelerated GL context available.
    pub webgl: bool,
    /// Enough GPU headroom for a full 3D scene graph.
    pub gpu_3d: bool,
    /// Battery saver or otherwise constrained device.
    pub low_power: bool,
}

impl DeviceCapabilities {
    /// Preferred backend key for this device.
    pub fn recommend_backend(self) -> &'static str {
        if self.low_power || !self.webgl {
            Canvas2dAdapter::KEY
        } else if self.gpu_3d {
            Scene3dAdapter::KEY
        } else {
            GlAdapter::KEY
        }
    }
}

/// How the engine picks a backend at mount time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendChoice {
    /// Use this registry key.
    Explicit(String),
    /// Ask the capability hint.
    Auto(DeviceCapabilities),
}

impl Default for BackendChoice {
    fn default() -> Self {
        Self::Explicit(Canvas2dAdapter::KEY.to_owned())
    }
}

impl BackendChoice {
    /// Registry key this choice selects.
    pub fn key(&self) -> &str {
        match self {
            Self::Explicit(k) => k,
            Self::Auto(caps) => caps.recommend_backend(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/registry.rs"]
mod tests;
