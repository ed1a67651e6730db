use super::*;
use crate::compose::stage_object::{Rotation, StageMetadata};
use crate::foundation::core::{StageOrigin, Vec3};
use crate::scene::model::{Align, Fit};

fn object(id: &str, src: &str, z: f64) -> StageObject {
    StageObject {
        id: id.to_owned(),
        position: Vec3::new(0.0, 0.0, z),
        rotation: Rotation::Z(0.0),
        scale: Vec3::new(1.0, 1.0, 1.0),
        visible: true,
        metadata: StageMetadata {
            src: src.to_owned(),
            w: None,
            h: None,
            opacity: 0.5,
            anchor: [0.0, 0.0],
            fit: Fit::Contain,
            align: Align::Center,
            stage_origin: StageOrigin::TopLeft,
        },
    }
}

fn resource(url: &str, w: u32, h: u32) -> Arc<Resource> {
    Arc::new(Resource {
        url: url.to_owned(),
        width: w,
        height: h,
        rgba8_premul: Arc::new(vec![0; (w * h * 4) as usize]),
    })
}

fn mounted() -> GlAdapter {
    let mut a = GlAdapter::new(AdapterSettings {
        clear_rgba: Some([255, 0, 0, 255]),
    });
    a.mount(Surface::new(100, 50).unwrap()).unwrap();
    a
}

#[test]
fn quad_maps_to_clip_space() {
    let mut a = mounted();
    a.upsert(&object("a", "a.png", 0.0), Some(&resource("a.png", 50, 25)));
    a.present().unwrap();

    let v = a.vertices();
    assert_eq!(v.len(), 4);
    assert_eq!(v[0].pos, [-1.0, 1.0]);
    assert_eq!(v[2].pos, [0.0, 0.0]);
    assert_eq!(v[2].uv, [1.0, 1.0]);
    assert_eq!(v[0].alpha, 0.5);
    assert_eq!(a.clear_color(), [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn textures_upload_once_and_batch() {
    let mut a = mounted();
    let shared = resource("s.png", 4, 4);
    a.upsert(&object("a", "s.png", 0.0), Some(&shared));
    a.upsert(&object("b", "s.png", 1.0), Some(&shared));
    a.upsert(&object("c", "o.png", 2.0), Some(&resource("o.png", 2, 2)));
    a.upsert(&object("d", "s.png", 3.0), Some(&shared));
    a.present().unwrap();

    assert_eq!(a.stats().textures, 2);
    assert_eq!(a.texture("s.png").unwrap().slot, 0);
    let calls: Vec<(usize, usize, usize)> = a
        .draw_calls()
        .iter()
        .map(|c| (c.texture, c.first_quad, c.quads))
        .collect();
    assert_eq!(calls, vec![(0, 0, 2), (1, 2, 1), (0, 3, 1)]);
}

#[test]
fn objects_without_textures_are_not_drawn() {
    let mut a = mounted();
    a.upsert(&object("a", "missing.png", 0.0), None);
    a.present().unwrap();
    assert_eq!(a.stats().drawn, 0);
    assert_eq!(a.stats().objects, 1);
}

#[test]
fn oversized_viewport_fails_to_mount() {
    let mut a = GlAdapter::new(AdapterSettings::default());
    let huge = Surface::with_pixel_ratio(10_000, 100, 2.0).unwrap();
    let err = a.mount(huge).unwrap_err();
    assert!(matches!(err, StageError::RenderBackend(_)));
    assert!(a.present().is_err());
}

#[test]
fn textures_are_freed_with_their_last_object() {
    let mut a = mounted();
    let shared = resource("s.png", 4, 4);
    a.upsert(&object("a", "s.png", 0.0), Some(&shared));
    a.upsert(&object("b", "s.png", 1.0), Some(&shared));
    a.upsert(&object("c", "o.png", 2.0), Some(&resource("o.png", 2, 2)));
    assert_eq!(a.stats().textures, 2);

    assert!(a.remove("a"));
    assert_eq!(a.stats().textures, 2);
    assert!(a.remove("b"));
    assert_eq!(a.stats().textures, 1);
    assert!(a.texture("s.png").is_none());

    // Switching source releases the old texture and reuses its slot.
    a.upsert(&object("c", "n.png", 2.0), Some(&resource("n.png", 3, 3)));
    assert_eq!(a.stats().textures, 1);
    assert!(a.texture("o.png").is_none());
    assert!(a.texture("n.png").unwrap().slot <= 1);

    // A rebuild cycle does not grow the slot range.
    for round in 0..5 {
        let url = format!("r{round}.png");
        a.upsert(&object("r", &url, 3.0), Some(&resource(&url, 1, 1)));
        assert!(a.remove("r"));
    }
    assert_eq!(a.stats().textures, 1);
    a.upsert(&object("r", "last.png", 3.0), Some(&resource("last.png", 1, 1)));
    assert!(a.texture("last.png").unwrap().slot <= 1);
}

#[test]
fn oversized_resize_keeps_the_viewport() {
    let mut a = mounted();
    a.upsert(&object("a", "a.png", 0.0), Some(&resource("a.png", 50, 25)));
    a.resize(Surface::new(20_000, 50).unwrap());
    a.present().unwrap();
    assert_eq!(a.vertices()[2].pos, [0.0, 0.0]);

    a.resize(Surface::new(50, 25).unwrap());
    a.present().unwrap();
    assert_eq!(a.vertices()[2].pos, [1.0, -1.0]);
}
