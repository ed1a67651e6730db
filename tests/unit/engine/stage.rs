use std::sync::Mutex;

use super::*;
use crate::{
    assets::loader::Resource,
    compose::stage_object::Rotation,
    engine::host::HeadlessHost,
    foundation::clock::ManualClock,
    render::canvas2d::Canvas2dAdapter,
    render::registry::DeviceCapabilities,
    scene::normalize::ImageRef,
};

#[derive(Default)]
struct TestLoader {
    loads: Mutex<Vec<String>>,
    released: Mutex<Vec<String>>,
}

impl ResourceLoader for TestLoader {
    fn load(&self, url: &str) -> StageResult<Resource> {
        self.loads.lock().unwrap().push(url.to_owned());
        if url.contains("broken") {
            return Err(StageError::asset_load(format!("cannot fetch '{url}'")));
        }
        Ok(Resource {
            url: url.to_owned(),
            width: 4,
            height: 2,
            rgba8_premul: Arc::new(vec![255; 4 * 4 * 2]),
        })
    }

    fn release(&self, resource: &Resource) {
        self.released.lock().unwrap().push(resource.url.clone());
    }
}

struct Fixture {
    clock: Arc<ManualClock>,
    loader: Arc<TestLoader>,
    host: HeadlessHost,
    engine: StageEngine,
}

fn fixture_with(opts: EngineOpts) -> Fixture {
    let clock = Arc::new(ManualClock::new(0.0));
    let loader = Arc::new(TestLoader::default());
    let cache = AssetCache::with_threads(loader.clone(), Some(2)).unwrap();
    let resolver = AssetResolver::new().with_registry(std::collections::HashMap::from([(
        "sun".to_owned(),
        "assets/sun.png".to_owned(),
    )]));
    let engine = StageEngine::with_registry(
        opts,
        Arc::new(AdapterRegistry::with_builtin()),
        clock.clone(),
        resolver,
        cache,
    );
    Fixture {
        clock,
        loader,
        host: HeadlessHost::new(Surface::new(200, 100).unwrap()),
        engine,
    }
}

fn fixture() -> Fixture {
    fixture_with(EngineOpts::default())
}

fn scene(json: serde_json::Value) -> SceneConfig {
    serde_json::from_value(json).unwrap()
}

fn spinning() -> SceneConfig {
    scene(serde_json::json!({
        "layers": [
            { "id": "still", "src": "a.png" },
            { "id": "spinner", "src": "b.png",
              "spin": { "enable": true, "speedDegPerSec": 10 } }
        ]
    }))
}

#[test]
fn build_before_mount_pushes_on_mount() {
    let mut f = fixture();
    let report = f.engine.build(&spinning()).unwrap();
    assert_eq!(report.objects.len(), 2);
    assert!(f.engine.adapter_stats().is_none());

    f.engine.mount(&mut f.host).unwrap();
    let stats = f.engine.adapter_stats().unwrap();
    assert_eq!(stats.objects, 2);
    assert_eq!(stats.drawn, 2);
    assert_eq!(f.host.subscriptions().len(), 3);
}

#[test]
fn shared_urls_load_once() {
    let mut f = fixture();
    let report = f
        .engine
        .build(&scene(serde_json::json!({
            "layers": [
                { "id": "a", "src": "a.png" },
                { "id": "b", "src": "a.png" },
                { "id": "c", "src": "c.png" }
            ]
        })))
        .unwrap();
    assert_eq!(report.objects.len(), 3);
    assert_eq!(report.distinct_urls, 2);
    assert_eq!(f.loader.loads.lock().unwrap().len(), 2);
    assert_eq!(f.engine.stats().loads_attempted, 2);
}

#[test]
fn failing_layers_are_skipped_not_fatal() {
    let mut f = fixture();
    f.engine.mount(&mut f.host).unwrap();
    let report = f
        .engine
        .build(&scene(serde_json::json!({
            "layers": [
                { "id": "ok", "imageId": "sun" },
                { "id": "gone", "src": "broken.png" },
                { "id": "nobody", "imageId": "moon" },
                { "id": "blank" }
            ]
        })))
        .unwrap();

    let ids: Vec<&str> = report.objects.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["ok"]);
    assert_eq!(report.objects[0].metadata.src, "assets/sun.png");

    let skipped: Vec<(&str, SkipReason)> = report
        .skipped
        .iter()
        .map(|s| (s.id.as_str(), s.reason))
        .collect();
    assert_eq!(
        skipped,
        vec![
            ("nobody", SkipReason::AssetResolution),
            ("blank", SkipReason::AssetResolution),
            ("gone", SkipReason::AssetLoad),
        ]
    );
    assert_eq!(report.prefetch.failed.len(), 1);
    assert_eq!(f.engine.adapter_stats().unwrap().objects, 1);
}

#[test]
fn objects_follow_order_then_declaration() {
    let mut f = fixture();
    f.engine
        .build(&scene(serde_json::json!({
            "layers": [
                { "id": "top", "src": "a.png", "order": 5 },
                { "id": "first", "src": "a.png", "order": 1 },
                { "id": "second", "src": "a.png", "order": 1 },
                { "id": "bottom", "src": "a.png", "order": -3 }
            ]
        })))
        .unwrap();
    let ids: Vec<&str> = f.engine.objects().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["bottom", "first", "second", "top"]);
}

#[test]
fn static_scene_ticks_are_skipped() {
    let mut f = fixture();
    f.engine
        .build(&scene(serde_json::json!({ "layers": [{ "id": "a", "src": "a.png" }] })))
        .unwrap();
    assert_eq!(f.engine.tick().unwrap(), TickOutcome::NotMounted);

    f.engine.mount(&mut f.host).unwrap();
    f.clock.advance(1.0);
    assert_eq!(f.engine.tick().unwrap(), TickOutcome::Idle);
    assert_eq!(f.engine.stats().ticks_skipped, 1);
}

#[test]
fn idle_skipping_can_be_disabled() {
    let mut f = fixture_with(EngineOpts {
        skip_idle_ticks: false,
        ..EngineOpts::default()
    });
    f.engine
        .build(&scene(serde_json::json!({ "layers": [{ "id": "a", "src": "a.png" }] })))
        .unwrap();
    f.engine.mount(&mut f.host).unwrap();
    assert_eq!(
        f.engine.tick().unwrap(),
        TickOutcome::Rendered { updated: 0 }
    );
}

#[test]
fn ticks_update_only_animated_layers() {
    let mut f = fixture();
    f.engine.build(&spinning()).unwrap();
    f.engine.mount(&mut f.host).unwrap();

    f.clock.advance(3.0);
    assert_eq!(
        f.engine.tick().unwrap(),
        TickOutcome::Rendered { updated: 1 }
    );
    let Rotation::Z(r) = f.engine.object("spinner").unwrap().rotation else {
        panic!("flat backend expects z rotation");
    };
    assert!((r - 30f64.to_radians()).abs() < 1e-9);
    assert_eq!(f.engine.object("still").unwrap().rotation, Rotation::Z(0.0));
}

#[test]
fn finished_windows_settle_then_go_idle() {
    let mut f = fixture();
    f.engine
        .build(&scene(serde_json::json!({
            "layers": [{ "id": "a", "src": "a.png",
                "spin": { "enable": true, "speedDegPerSec": 90, "duration": 1000 } }]
        })))
        .unwrap();
    f.engine.mount(&mut f.host).unwrap();

    f.clock.set(0.5);
    assert!(matches!(f.engine.tick().unwrap(), TickOutcome::Rendered { .. }));
    f.clock.set(2.0);
    assert!(matches!(f.engine.tick().unwrap(), TickOutcome::Rendered { .. }));
    f.clock.set(3.0);
    assert_eq!(f.engine.tick().unwrap(), TickOutcome::Idle);
}

#[test]
fn hidden_host_pauses_ticks() {
    let mut f = fixture();
    f.engine.build(&spinning()).unwrap();
    f.engine.mount(&mut f.host).unwrap();

    f.host.emit(HostEvent::VisibilityChanged(false));
    f.host.emit(HostEvent::Frame);
    assert_eq!(f.engine.pump(&mut f.host).unwrap(), 2);
    assert!(!f.engine.is_visible());
    assert_eq!(f.engine.stats().ticks_hidden, 1);

    f.engine.set_visible(true);
    assert!(matches!(f.engine.tick().unwrap(), TickOutcome::Rendered { .. }));
}

#[test]
fn resize_keeps_scene_time() {
    let mut f = fixture();
    f.engine.build(&spinning()).unwrap();
    f.engine.mount(&mut f.host).unwrap();

    f.clock.advance(2.0);
    let bigger = Surface::new(400, 300).unwrap();
    f.host.emit(HostEvent::Resize(bigger));
    f.engine.pump(&mut f.host).unwrap();

    assert_eq!(f.engine.surface(), Some(bigger));
    assert_eq!(f.engine.stats().resizes, 1);
    assert!((f.engine.frame_time().elapsed_secs - 2.0).abs() < 1e-12);
    let Rotation::Z(r) = f.engine.object("spinner").unwrap().rotation else {
        panic!("flat backend expects z rotation");
    };
    assert!((r - 20f64.to_radians()).abs() < 1e-9);
}

#[test]
fn rebuild_restarts_scene_time() {
    let mut f = fixture();
    f.engine.build(&spinning()).unwrap();
    f.clock.advance(5.0);
    f.engine.build(&spinning()).unwrap();
    assert_eq!(f.engine.frame_time().elapsed_secs, 0.0);
    assert_eq!(f.engine.objects().count(), 2);
}

#[test]
fn update_and_remove_objects() {
    let mut f = fixture();
    f.engine.build(&spinning()).unwrap();
    f.engine.mount(&mut f.host).unwrap();

    let changed = f
        .engine
        .update_object("still", |l| {
            l.position = kurbo::Vec2::new(7.0, 9.0);
            l.id = "renamed".to_owned();
        })
        .unwrap();
    assert!(changed);
    let obj = f.engine.object("still").unwrap();
    assert_eq!((obj.position.x, obj.position.y), (7.0, 9.0));
    assert!(!f.engine.update_object("missing", |_| {}).unwrap());

    f.engine
        .update_object("still", |l| l.image = ImageRef::Source("c.png".to_owned()))
        .unwrap();
    assert_eq!(f.engine.object("still").unwrap().metadata.src, "c.png");

    assert!(f.engine.remove_object("still"));
    assert!(!f.engine.remove_object("still"));
    assert_eq!(f.engine.adapter_stats().unwrap().objects, 1);
}

#[test]
fn set_object_loads_on_demand() {
    let mut f = fixture();
    f.engine.mount(&mut f.host).unwrap();
    let layer = normalize_scene(&scene(serde_json::json!({
        "layers": [{ "id": "late", "src": "late.png", "x": 3 }]
    })))
    .layers
    .remove(0);

    let obj = f.engine.set_object(layer.clone()).unwrap();
    assert_eq!(obj.position.x, 3.0);
    assert_eq!(f.loader.loads.lock().unwrap().as_slice(), ["late.png"]);

    let mut broken = layer;
    broken.id = "broken".to_owned();
    broken.image = ImageRef::Source("broken.png".to_owned());
    assert!(matches!(
        f.engine.set_object(broken),
        Err(StageError::AssetLoad(_))
    ));
}

#[test]
fn mount_is_exclusive() {
    let mut f = fixture();
    f.engine.mount(&mut f.host).unwrap();
    assert!(f.engine.mount(&mut f.host).is_err());
}

#[test]
fn mount_failure_leaves_engine_unmounted() {
    let mut f = fixture_with(EngineOpts {
        backend: BackendChoice::Explicit("gl".to_owned()),
        ..EngineOpts::default()
    });
    let mut huge = HeadlessHost::new(Surface::new(20_000, 10).unwrap());
    let err = f.engine.mount(&mut huge).unwrap_err();
    assert!(matches!(err, StageError::RenderBackend(_)));
    assert!(!f.engine.is_mounted());
    assert!(huge.subscriptions().is_empty());

    let mut unknown = fixture_with(EngineOpts {
        backend: BackendChoice::Explicit("vr".to_owned()),
        ..EngineOpts::default()
    });
    assert!(unknown.engine.mount(&mut unknown.host).is_err());
}

#[test]
fn auto_backend_uses_capabilities() {
    let mut f = fixture_with(EngineOpts {
        backend: BackendChoice::Auto(DeviceCapabilities {
            webgl: true,
            gpu_3d: true,
            low_power: false,
        }),
        ..EngineOpts::default()
    });
    f.engine.build(&spinning()).unwrap();
    f.engine.mount(&mut f.host).unwrap();
    assert_eq!(f.engine.adapter().unwrap().key(), "scene3d");
    assert!(matches!(
        f.engine.object("spinner").unwrap().rotation,
        Rotation::Euler(_)
    ));
}

#[test]
fn teardown_releases_everything_once() {
    let mut f = fixture();
    f.engine.build(&spinning()).unwrap();
    f.engine.mount(&mut f.host).unwrap();

    f.engine.teardown(&mut f.host);
    assert!(f.host.subscriptions().is_empty());
    assert!(!f.engine.is_mounted());
    assert!(f.engine.cache().is_disposed());
    assert_eq!(f.loader.released.lock().unwrap().len(), 2);

    f.engine.teardown(&mut f.host);
    assert_eq!(f.loader.released.lock().unwrap().len(), 2);
    assert!(f.engine.build(&spinning()).is_err());
    assert!(f.engine.mount(&mut f.host).is_err());
}

/// Canvas2d wrapper that records the draw order of every present.
struct RecordingCanvas {
    inner: Canvas2dAdapter,
    painted: Arc<Mutex<Vec<String>>>,
}

impl CanvasAdapter for RecordingCanvas {
    fn key(&self) -> &'static str {
        "recording"
    }

    fn render_mode(&self) -> RenderMode {
        self.inner.render_mode()
    }

    fn mount(&mut self, surface: Surface) -> StageResult<()> {
        self.inner.mount(surface)
    }

    fn upsert(&mut self, obj: &StageObject, resource: Option<&Arc<Resource>>) {
        self.inner.upsert(obj, resource);
    }

    fn remove(&mut self, id: &str) -> bool {
        self.inner.remove(id)
    }

    fn resize(&mut self, surface: Surface) {
        self.inner.resize(surface);
    }

    fn present(&mut self) -> StageResult<()> {
        self.inner.present()?;
        *self.painted.lock().unwrap() = self
            .inner
            .draw_list()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        Ok(())
    }

    fn dispose(&mut self) {
        self.inner.dispose();
    }

    fn stats(&self) -> AdapterStats {
        self.inner.stats()
    }
}

fn recording_fixture() -> (Fixture, Arc<Mutex<Vec<String>>>) {
    let painted: Arc<Mutex<Vec<String>>> = Arc::default();
    let mut registry = AdapterRegistry::empty();
    let sink = painted.clone();
    registry
        .register(
            "recording",
            Arc::new(move |settings: &AdapterSettings| -> StageResult<Box<dyn CanvasAdapter>> {
                Ok(Box::new(RecordingCanvas {
                    inner: Canvas2dAdapter::new(settings.clone()),
                    painted: sink.clone(),
                }))
            }),
        )
        .unwrap();

    let clock = Arc::new(ManualClock::new(0.0));
    let loader = Arc::new(TestLoader::default());
    let engine = StageEngine::with_registry(
        EngineOpts {
            backend: BackendChoice::Explicit("recording".to_owned()),
            ..EngineOpts::default()
        },
        Arc::new(registry),
        clock.clone(),
        AssetResolver::new(),
        AssetCache::new(loader.clone()),
    );
    let f = Fixture {
        clock,
        loader,
        host: HeadlessHost::new(Surface::new(200, 100).unwrap()),
        engine,
    };
    (f, painted)
}

fn equal_order_scene() -> SceneConfig {
    scene(serde_json::json!({
        "layers": [
            { "id": "b", "src": "a.png", "order": 1 },
            { "id": "a", "src": "a.png", "order": 1 },
            { "id": "top", "src": "a.png", "order": 2,
              "spin": { "enable": true, "speedDegPerSec": 10 } }
        ]
    }))
}

#[test]
fn backend_paints_equal_orders_in_declaration_order() {
    let (mut f, painted) = recording_fixture();
    f.engine.build(&equal_order_scene()).unwrap();
    f.engine.mount(&mut f.host).unwrap();

    let engine_order: Vec<String> = f.engine.objects().map(|o| o.id.clone()).collect();
    assert_eq!(engine_order, vec!["b", "a", "top"]);
    assert_eq!(*painted.lock().unwrap(), engine_order);

    f.clock.advance(1.0);
    f.engine.tick().unwrap();
    f.engine.resize(Surface::new(300, 200).unwrap()).unwrap();
    assert_eq!(*painted.lock().unwrap(), engine_order);
}

#[test]
fn late_objects_take_their_declared_slot() {
    let (mut f, painted) = recording_fixture();
    f.engine.mount(&mut f.host).unwrap();
    f.engine.build(&equal_order_scene()).unwrap();

    let mut first = f.engine.layer("b").unwrap().clone();
    first.id = "first".to_owned();
    first.index = 0;
    f.engine.remove_object("b");
    f.engine.set_object(first).unwrap();
    assert_eq!(*painted.lock().unwrap(), vec!["first", "a", "top"]);

    f.engine.update_object("top", |l| l.order = 1).unwrap();
    assert_eq!(*painted.lock().unwrap(), vec!["first", "a", "top"]);
    f.engine.update_object("first", |l| l.order = 3).unwrap();
    assert_eq!(*painted.lock().unwrap(), vec!["a", "top", "first"]);
}
