use super::*;
use crate::foundation::core::Surface;

#[test]
fn builtin_keys_create_matching_adapters() {
    let r = AdapterRegistry::with_builtin();
    assert_eq!(r.keys().collect::<Vec<_>>(), vec!["canvas2d", "gl", "scene3d"]);
    for key in ["canvas2d", "gl", "scene3d"] {
        let a = r.create(key, &AdapterSettings::default()).unwrap();
        assert_eq!(a.key(), key);
    }
}

#[test]
fn unknown_key_lists_alternatives() {
    let err = AdapterRegistry::with_builtin()
        .create("vulkan", &AdapterSettings::default())
        .err()
        .unwrap();
    assert!(matches!(err, StageError::RenderBackend(_)));
    assert!(err.to_string().contains("canvas2d, gl, scene3d"));
}

#[test]
fn duplicate_and_empty_keys_are_rejected() {
    let mut r = AdapterRegistry::with_builtin();
    let factory: AdapterFactory = Arc::new(create_canvas2d);
    assert!(r.register("gl", factory.clone()).is_err());
    assert!(r.register(" ", factory.clone()).is_err());
    r.register("mirror", factory).unwrap();
    assert!(r.contains("mirror"));
}

#[test]
fn factories_may_fail() {
    let mut r = AdapterRegistry::empty();
    r.register(
        "broken",
        Arc::new(
            |_: &AdapterSettings| -> StageResult<Box<dyn CanvasAdapter>> {
                Err(StageError::render_backend("no context"))
            },
        ),
    )
    .unwrap();
    let err = r.create("broken", &AdapterSettings::default()).err().unwrap();
    assert_eq!(err.to_string(), "render backend error: no context");
}

#[test]
fn created_adapters_are_independent() {
    let r = AdapterRegistry::with_builtin();
    let mut a = r.create("canvas2d", &AdapterSettings::default()).unwrap();
    let b = r.create("canvas2d", &AdapterSettings::default()).unwrap();
    a.mount(Surface::new(1, 1).unwrap()).unwrap();
    a.present().unwrap();
    assert_eq!(a.stats().presents, 1);
    assert_eq!(b.stats().presents, 0);
}

#[test]
fn capabilities_pick_a_backend() {
    let caps = |webgl, gpu_3d, low_power| DeviceCapabilities {
        webgl,
        gpu_3d,
        low_power,
    };
    assert_eq!(caps(false, false, false).recommend_backend(), "canvas2d");
    assert_eq!(caps(true, true, true).recommend_backend(), "canvas2d");
    assert_eq!(caps(true, false, false).recommend_backend(), "gl");
    assert_eq!(caps(true, true, false).recommend_backend(), "scene3d");

    assert_eq!(BackendChoice::default().key(), "canvas2d");
    assert_eq!(BackendChoice::Auto(caps(true, true, false)).key(), "scene3d");
    assert_eq!(BackendChoice::Explicit("custom".to_owned()).key(), "custom");
}

#[test]
fn global_registry_has_builtins() {
    let g = global();
    assert!(g.contains("canvas2d"));
    assert!(Arc::ptr_eq(&g, &global()));
}
