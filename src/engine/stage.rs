use std::{collections::BTreeMap, sync::Arc};

use crate::{
    assets::cache::{AssetCache, PrefetchReport},
    assets::loader::{Resource, ResourceLoader},
    assets::resolve::AssetResolver,
    compose::stage_object::{RenderMode, StageObject, apply_composed, to_stage_object},
    compose::transform::compose,
    engine::host::{Host, HostEvent, HostEventKind, Subscription},
    foundation::clock::{Clock, SceneClock},
    foundation::core::{FrameTime, StageOrigin, Surface},
    foundation::error::{StageError, StageResult},
    render::adapter::{AdapterSettings, AdapterStats, CanvasAdapter},
    render::registry::{AdapterRegistry, BackendChoice, global},
    scene::model::SceneConfig,
    scene::normalize::{ConfigWarning, NormalizedLayer, normalize_scene},
};

/// Options controlling a [`StageEngine`].
#[derive(Clone, Debug)]
pub struct EngineOpts {
    /// Backend selection used by [`StageEngine::mount`].
    pub backend: BackendChoice,
    /// Settings handed to the backend factory.
    pub settings: AdapterSettings,
    /// Overrides the scene's declared stage origin.
    pub origin: Option<StageOrigin>,
    /// Prefetch worker threads for [`StageEngine::with_loader`]. `None` uses rayon defaults.
    pub prefetch_threads: Option<usize>,
    /// Skip ticks while no behavior is active.
    pub skip_idle_ticks: bool,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            backend: BackendChoice::default(),
            settings: AdapterSettings::default(),
            origin: None,
            prefetch_threads: None,
            skip_idle_ticks: true,
        }
    }
}

/// Engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct EngineStats {
    /// Ticks that recomputed and presented.
    pub ticks_rendered: u64,
    /// Ticks skipped because nothing was animating.
    pub ticks_skipped: u64,
    /// Ticks skipped because the host was hidden.
    pub ticks_hidden: u64,
    /// Object upserts sent to the backend.
    pub objects_pushed: u64,
    /// Resize events handled.
    pub resizes: u64,
    /// URLs handed to the asset loader.
    pub loads_attempted: u64,
}

/// Why a layer has no stage object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// No URL could be derived for the image reference.
    AssetResolution,
    /// The URL could not be loaded.
    AssetLoad,
}

/// A layer left out of the scene.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SkippedLayer {
    /// Layer id.
    pub id: String,
    /// Failure category.
    pub reason: SkipReason,
    /// Failure details.
    pub message: String,
}

/// Result of [`StageEngine::build`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct BuildReport {
    /// Objects created, in paint order.
    pub objects: Vec<StageObject>,
    /// Layers left out.
    pub skipped: Vec<SkippedLayer>,
    /// Configuration problems replaced by defaults.
    pub warnings: Vec<ConfigWarning>,
    /// Distinct URLs referenced by the scene.
    pub distinct_urls: usize,
    /// Prefetch outcome.
    pub prefetch: PrefetchReport,
}

/// Outcome of one [`StageEngine::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TickOutcome {
    /// Animated layers were recomputed and presented.
    Rendered {
        /// Layers recomputed.
        updated: usize,
    },
    /// Nothing active; tick skipped.
    Idle,
    /// Host hidden; tick skipped.
    Hidden,
    /// No backend mounted.
    NotMounted,
}

#[derive(Clone, Debug)]
struct LiveObject {
    layer: NormalizedLayer,
    object: StageObject,
    resource: Arc<Resource>,
}

/// Owns a mounted scene: the live object set, the per-frame loop, resize and teardown.
///
/// The engine is driven from one thread by host events; only asset prefetch fans out.
pub struct StageEngine {
    opts: EngineOpts,
    registry: Arc<AdapterRegistry>,
    clock: SceneClock,
    resolver: AssetResolver,
    cache: AssetCache,
    adapter: Option<Box<dyn CanvasAdapter>>,
    surface: Option<Surface>,
    subscriptions: Vec<Subscription>,
    objects: BTreeMap<String, LiveObject>,
    origin: StageOrigin,
    visible: bool,
    was_animating: bool,
    torn_down: bool,
    stats: EngineStats,
}

impl std::fmt::Debug for StageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageEngine")
            .field("backend", &self.adapter.as_ref().map(|a| a.key()))
            .field("objects", &self.objects.len())
            .field("origin", &self.origin)
            .field("visible", &self.visible)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl StageEngine {
    /// Engine using the process-wide adapter registry and an injected cache.
    pub fn new(
        opts: EngineOpts,
        clock: Arc<dyn Clock>,
        resolver: AssetResolver,
        cache: AssetCache,
    ) -> Self {
        Self::with_registry(opts, global(), clock, resolver, cache)
    }

    /// Engine owning a fresh cache over `loader`, sized by `opts.prefetch_threads`.
    pub fn with_loader(
        opts: EngineOpts,
        clock: Arc<dyn Clock>,
        resolver: AssetResolver,
        loader: Arc<dyn ResourceLoader>,
    ) -> StageResult<Self> {
        let cache = match opts.prefetch_threads {
            Some(n) => AssetCache::with_threads(loader, Some(n))?,
            None => AssetCache::new(loader),
        };
        Ok(Self::new(opts, clock, resolver, cache))
    }

    /// Engine using an explicit adapter registry.
    pub fn with_registry(
        opts: EngineOpts,
        registry: Arc<AdapterRegistry>,
        clock: Arc<dyn Clock>,
        resolver: AssetResolver,
        cache: AssetCache,
    ) -> Self {
        let origin = opts.origin.unwrap_or_default();
        Self {
            opts,
            registry,
            clock: SceneClock::start(clock),
            resolver,
            cache,
            adapter: None,
            surface: None,
            subscriptions: Vec::new(),
            objects: BTreeMap::new(),
            origin,
            visible: true,
            was_animating: false,
            torn_down: false,
            stats: EngineStats::default(),
        }
    }

    /// Select a backend, attach it to the host surface and subscribe to host events.
    ///
    /// Backend creation or mount failure is returned; the engine stays unmounted.
    #[tracing::instrument(level = "debug", skip_all, fields(backend = %self.opts.backend.key()))]
    pub fn mount(&mut self, host: &mut dyn Host) -> StageResult<()> {
        if self.torn_down {
            return Err(StageError::validation("engine was torn down"));
        }
        if self.adapter.is_some() {
            return Err(StageError::validation("engine is already mounted"));
        }

        let key = self.opts.backend.key().to_owned();
        let mut adapter = self.registry.create(&key, &self.opts.settings)?;
        let surface = host.surface();
        adapter.mount(surface).map_err(|e| {
            tracing::error!(backend = %key, error = %e, "backend mount failed");
            e
        })?;

        self.subscriptions = [
            HostEventKind::Frame,
            HostEventKind::Resize,
            HostEventKind::Visibility,
        ]
        .into_iter()
        .map(|kind| host.subscribe(kind))
        .collect();
        self.surface = Some(surface);
        self.visible = host.is_visible();
        self.adapter = Some(adapter);
        tracing::info!(backend = %key, width = surface.width, height = surface.height, "mounted");

        // Objects built before mounting are pushed now.
        self.refresh_all()?;
        Ok(())
    }

    /// Replace the scene with `cfg`.
    ///
    /// Per-layer problems (bad config, unresolvable references, failed loads) are collected in
    /// the report; only backend failures escape.
    #[tracing::instrument(level = "debug", skip_all, fields(layers = cfg.layers.len()))]
    pub fn build(&mut self, cfg: &SceneConfig) -> StageResult<BuildReport> {
        if self.torn_down {
            return Err(StageError::validation("engine was torn down"));
        }

        let scene = normalize_scene(cfg);
        self.origin = self.opts.origin.unwrap_or(scene.origin);
        self.clear_objects();
        self.clock.restart();
        self.was_animating = false;

        let mut report = BuildReport {
            warnings: scene.warnings,
            ..BuildReport::default()
        };

        let mut resolved = Vec::with_capacity(scene.layers.len());
        for layer in scene.layers {
            match self.resolver.resolve(&layer.image) {
                Ok(url) => resolved.push((layer, url)),
                Err(e) => {
                    tracing::warn!(layer = %layer.id, error = %e, "layer skipped");
                    report.skipped.push(SkippedLayer {
                        id: layer.id,
                        reason: SkipReason::AssetResolution,
                        message: e.to_string(),
                    });
                }
            }
        }

        report.prefetch = self
            .cache
            .prefetch(resolved.iter().map(|(_, url)| url.as_str()));
        report.distinct_urls = report.prefetch.requested;
        self.sync_load_stats();

        let t = self.clock.frame_time();
        for (layer, url) in resolved {
            let Some(resource) = self.cache.get(&url) else {
                let message = self
                    .cache
                    .failure(&url)
                    .unwrap_or("resource unavailable")
                    .to_owned();
                report.skipped.push(SkippedLayer {
                    id: layer.id,
                    reason: SkipReason::AssetLoad,
                    message,
                });
                continue;
            };
            let object = self.make_object(&layer, url, t);
            self.insert_live(layer, object, resource);
        }

        self.present()?;
        report.objects = self.objects().cloned().collect();
        tracing::info!(
            objects = report.objects.len(),
            skipped = report.skipped.len(),
            warnings = report.warnings.len(),
            "scene built"
        );
        Ok(report)
    }

    /// Add or replace one layer, loading its image synchronously if needed.
    pub fn set_object(&mut self, layer: NormalizedLayer) -> StageResult<&StageObject> {
        if self.torn_down {
            return Err(StageError::validation("engine was torn down"));
        }
        let url = self.resolver.resolve(&layer.image)?;
        let resource = self.cache.get_or_load(&url);
        self.sync_load_stats();
        let resource = resource?;

        let object = self.make_object(&layer, url, self.clock.frame_time());
        let id = layer.id.clone();
        self.insert_live(layer, object, resource);
        self.present()?;
        self.objects
            .get(&id)
            .map(|live| &live.object)
            .ok_or_else(|| StageError::validation(format!("object '{id}' vanished")))
    }

    /// Edit a live layer in place and recompute its object. Returns `Ok(false)` for unknown ids.
    ///
    /// The id and declaration index cannot be changed through this call.
    pub fn update_object(
        &mut self,
        id: &str,
        edit: impl FnOnce(&mut NormalizedLayer),
    ) -> StageResult<bool> {
        let Some(live) = self.objects.get(id) else {
            return Ok(false);
        };
        let mut layer = live.layer.clone();
        edit(&mut layer);
        layer.id = live.layer.id.clone();
        layer.index = live.layer.index;
        let image_changed = layer.image != live.layer.image;
        let url = live.object.metadata.src.clone();
        let resource = Arc::clone(&live.resource);

        if image_changed {
            self.set_object(layer)?;
            return Ok(true);
        }

        let object = self.make_object(&layer, url, self.clock.frame_time());
        self.insert_live(layer, object, resource);
        self.present()?;
        Ok(true)
    }

    /// Drop a live object. Returns whether it existed.
    pub fn remove_object(&mut self, id: &str) -> bool {
        if self.objects.remove(id).is_none() {
            return false;
        }
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.remove(id);
        }
        true
    }

    /// Dispatch one host event.
    pub fn handle_event(&mut self, event: HostEvent) -> StageResult<()> {
        match event {
            HostEvent::Frame => self.tick().map(|_| ()),
            HostEvent::Resize(surface) => self.resize(surface),
            HostEvent::VisibilityChanged(visible) => {
                self.set_visible(visible);
                Ok(())
            }
        }
    }

    /// Drain and dispatch every pending host event. Returns how many were handled.
    pub fn pump(&mut self, host: &mut dyn Host) -> StageResult<usize> {
        let mut handled = 0;
        while let Some(event) = host.poll_event() {
            self.handle_event(event)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Recompute animated layers at the current scene time and present.
    ///
    /// Skipped while hidden, and (with `skip_idle_ticks`) while no behavior is active. One extra
    /// tick runs after the last behavior goes inactive so objects settle on their base transform.
    pub fn tick(&mut self) -> StageResult<TickOutcome> {
        if self.adapter.is_none() {
            return Ok(TickOutcome::NotMounted);
        }
        if !self.visible {
            self.stats.ticks_hidden += 1;
            return Ok(TickOutcome::Hidden);
        }

        let t = self.clock.frame_time();
        let animating = self
            .objects
            .values()
            .any(|live| live.layer.behaviors.is_active(t));
        if self.opts.skip_idle_ticks && !animating && !self.was_animating {
            self.stats.ticks_skipped += 1;
            return Ok(TickOutcome::Idle);
        }

        let mode = self.render_mode();
        let mut updated = 0;
        for id in self.paint_order() {
            let Some(live) = self.objects.get_mut(&id) else {
                continue;
            };
            if !live.layer.behaviors.is_animated() {
                continue;
            }
            let composed = compose(&live.layer, t);
            apply_composed(&mut live.object, &composed, mode);
            if let Some(adapter) = self.adapter.as_mut() {
                adapter.upsert(&live.object, Some(&live.resource));
            }
            updated += 1;
        }
        self.stats.objects_pushed += updated as u64;
        self.present()?;

        self.was_animating = animating;
        self.stats.ticks_rendered += 1;
        Ok(TickOutcome::Rendered { updated })
    }

    /// Apply a new surface: every object is recomputed at the current scene time.
    ///
    /// The scene clock is not touched, so orbit and clock positions continue without a jump.
    pub fn resize(&mut self, surface: Surface) -> StageResult<()> {
        self.surface = Some(surface);
        self.stats.resizes += 1;
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.resize(surface);
        }
        tracing::debug!(width = surface.width, height = surface.height, "resize");
        self.refresh_all()
    }

    /// Pause or resume ticking. The scene clock keeps running while hidden.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            tracing::debug!(visible, "visibility changed");
        }
        self.visible = visible;
    }

    /// Unsubscribe from the host, then dispose the backend, then release every cached resource.
    ///
    /// Idempotent; the engine cannot be mounted or built again afterwards.
    pub fn teardown(&mut self, host: &mut dyn Host) {
        if self.torn_down {
            return;
        }
        for sub in self.subscriptions.drain(..) {
            host.unsubscribe(sub);
        }
        if let Some(mut adapter) = self.adapter.take() {
            adapter.dispose();
        }
        self.objects.clear();
        self.cache.dispose();
        self.torn_down = true;
        tracing::info!("stage torn down");
    }

    /// Live objects in paint order.
    pub fn objects(&self) -> impl Iterator<Item = &StageObject> {
        let mut live: Vec<&LiveObject> = self.objects.values().collect();
        live.sort_by_key(|l| (l.layer.order, l.layer.index));
        live.into_iter().map(|l| &l.object)
    }

    /// Live object by id.
    pub fn object(&self, id: &str) -> Option<&StageObject> {
        self.objects.get(id).map(|l| &l.object)
    }

    /// Live layer by id.
    pub fn layer(&self, id: &str) -> Option<&NormalizedLayer> {
        self.objects.get(id).map(|l| &l.layer)
    }

    /// Mounted backend.
    pub fn adapter(&self) -> Option<&dyn CanvasAdapter> {
        self.adapter.as_deref()
    }

    /// Backend counters, if mounted.
    pub fn adapter_stats(&self) -> Option<AdapterStats> {
        self.adapter.as_ref().map(|a| a.stats())
    }

    /// Return `true` while a backend is mounted.
    pub fn is_mounted(&self) -> bool {
        self.adapter.is_some()
    }

    /// Return `true` while ticks are allowed to run.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Effective stage origin.
    pub fn origin(&self) -> StageOrigin {
        self.origin
    }

    /// Current surface.
    pub fn surface(&self) -> Option<Surface> {
        self.surface
    }

    /// Sample the scene clock.
    pub fn frame_time(&self) -> FrameTime {
        self.clock.frame_time()
    }

    /// Engine counters.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// The injected asset cache.
    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    fn render_mode(&self) -> RenderMode {
        self.adapter
            .as_ref()
            .map(|a| a.render_mode())
            .unwrap_or_default()
    }

    fn make_object(&self, layer: &NormalizedLayer, url: String, t: FrameTime) -> StageObject {
        let composed = compose(layer, t);
        to_stage_object(layer, &composed, url, self.origin, self.render_mode())
    }

    fn insert_live(&mut self, layer: NormalizedLayer, object: StageObject, resource: Arc<Resource>) {
        let id = layer.id.clone();
        let key = (layer.order, layer.index);
        let reseat = self
            .objects
            .get(&id)
            .is_none_or(|prev| (prev.layer.order, prev.layer.index) != key);
        self.objects.insert(
            id.clone(),
            LiveObject {
                layer,
                object,
                resource,
            },
        );
        if self.adapter.is_none() {
            return;
        }

        // Backends break equal-z ties by insertion, so a new or reordered object is re-added
        // and everything painted after it follows.
        let mut push = vec![id.clone()];
        if reseat {
            push.extend(self.paint_order().into_iter().filter(|other| {
                *other != id
                    && self
                        .objects
                        .get(other)
                        .is_some_and(|l| (l.layer.order, l.layer.index) > key)
            }));
        }
        for other in push {
            let (Some(live), Some(adapter)) = (self.objects.get(&other), self.adapter.as_mut())
            else {
                continue;
            };
            if reseat {
                adapter.remove(&other);
            }
            adapter.upsert(&live.object, Some(&live.resource));
            self.stats.objects_pushed += 1;
        }
    }

    /// Live ids sorted by `(order, declaration index)`.
    fn paint_order(&self) -> Vec<String> {
        let mut live: Vec<&LiveObject> = self.objects.values().collect();
        live.sort_by_key(|l| (l.layer.order, l.layer.index));
        live.into_iter().map(|l| l.layer.id.clone()).collect()
    }

    fn clear_objects(&mut self) {
        let ids: Vec<String> = self.objects.keys().cloned().collect();
        for id in ids {
            self.remove_object(&id);
        }
    }

    fn refresh_all(&mut self) -> StageResult<()> {
        let t = self.clock.frame_time();
        let mode = self.render_mode();
        let origin = self.origin;
        let mut pushed = 0u64;
        for id in self.paint_order() {
            let Some(live) = self.objects.get_mut(&id) else {
                continue;
            };
            let composed = compose(&live.layer, t);
            live.object.metadata.stage_origin = origin;
            apply_composed(&mut live.object, &composed, mode);
            if let Some(adapter) = self.adapter.as_mut() {
                adapter.upsert(&live.object, Some(&live.resource));
                pushed += 1;
            }
        }
        self.stats.objects_pushed += pushed;
        self.present()
    }

    fn present(&mut self) -> StageResult<()> {
        match self.adapter.as_mut() {
            Some(adapter) => adapter.present(),
            None => Ok(()),
        }
    }

    fn sync_load_stats(&mut self) {
        self.stats.loads_attempted = self.cache.loads_attempted() as u64;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/stage.rs"]
mod tests;
