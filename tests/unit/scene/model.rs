use super::*;

#[test]
fn vec_def_accepts_number_pair_and_object() {
    let v: Vec<VecDef> =
        serde_json::from_str(r#"[2, [1, 3], {"x": 4, "y": 5}, "big", [1, 2, 3]]"#).unwrap();
    assert_eq!(v[0], VecDef::Uniform(2.0));
    assert_eq!(v[1], VecDef::Pair(1.0, 3.0));
    assert_eq!(v[2], VecDef::Pair(4.0, 5.0));
    assert!(matches!(v[3], VecDef::Other(_)));
    assert!(matches!(v[4], VecDef::Other(_)));
}

#[test]
fn wrong_types_are_kept_as_invalid() {
    let layer: LayerDef = serde_json::from_str(
        r#"{ "id": 7, "x": "left", "visible": "yes", "fit": "stretch", "order": 3 }"#,
    )
    .unwrap();
    assert!(matches!(layer.id, Some(Loose::Invalid(_))));
    assert!(matches!(layer.x, Some(Loose::Invalid(_))));
    assert!(matches!(layer.visible, Some(Loose::Invalid(_))));
    assert!(matches!(layer.fit, Some(Loose::Invalid(_))));
    assert_eq!(layer.order, Some(Loose::Valid(3)));
}

#[test]
fn scene_parses_camel_case_and_aliases() {
    let scene = SceneConfig::from_json_str(
        r#"{
            "version": 1,
            "origin": "top-left",
            "layers": [
                { "id": "a", "imageId": "sun", "rotationDeg": 90,
                  "spin": { "enabled": true, "periodSec": 4, "startDelay": 500 } },
                "not a layer"
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(scene.version, Some(Loose::Valid(1)));
    assert_eq!(scene.origin, Some(Loose::Valid(StageOrigin::TopLeft)));
    assert_eq!(scene.layers.len(), 2);
    assert!(matches!(scene.layers[1], Loose::Invalid(_)));

    let Loose::Valid(layer) = &scene.layers[0] else {
        panic!("first layer should parse");
    };
    assert_eq!(layer.image_id, Some(Loose::Valid("sun".to_owned())));
    assert_eq!(layer.rotation_deg, Some(Loose::Valid(90.0)));
    let Some(Loose::Valid(spin)) = &layer.spin else {
        panic!("spin should parse");
    };
    assert_eq!(spin.enable, Some(Loose::Valid(true)));
    assert_eq!(spin.period_sec, Some(Loose::Valid(4.0)));
    assert_eq!(spin.start_delay, Some(Loose::Valid(500.0)));
}

#[test]
fn malformed_document_is_a_serde_error() {
    let err = SceneConfig::from_json_str("{ layers: ").unwrap_err();
    assert!(matches!(err, StageError::Serde(_)));
}

#[test]
fn missing_file_reports_path() {
    let err = SceneConfig::from_path("/definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("not/here.json"));
}

#[test]
fn merge_prefers_own_fields() {
    let preset = SpinDef {
        enable: Some(Loose::Valid(true)),
        period_sec: Some(Loose::Valid(60.0)),
        direction: Some(Loose::Valid(Direction::Ccw)),
        ..SpinDef::default()
    };
    let layer = SpinDef {
        period_sec: Some(Loose::Valid(10.0)),
        ..SpinDef::default()
    };
    let merged = layer.merged_over(&preset);
    assert_eq!(merged.enable, Some(Loose::Valid(true)));
    assert_eq!(merged.period_sec, Some(Loose::Valid(10.0)));
    assert_eq!(merged.direction, Some(Loose::Valid(Direction::Ccw)));
}

#[test]
fn effect_items_replace_wholesale() {
    let base = EffectsDef {
        enable: Some(Loose::Valid(true)),
        items: vec![Loose::Valid(EffectDef::default()), Loose::Valid(EffectDef::default())],
    };
    let own = EffectsDef {
        enable: None,
        items: vec![Loose::Valid(EffectDef::default())],
    };
    let merged = own.merged_over(&base);
    assert_eq!(merged.items.len(), 1);
    assert_eq!(merged.enable, Some(Loose::Valid(true)));
    assert_eq!(EffectsDef::default().merged_over(&base).items.len(), 2);
}

#[test]
fn align_factors_cover_corners() {
    assert_eq!(Align::TopLeft.factors(), (0.0, 0.0));
    assert_eq!(Align::BottomRight.factors(), (1.0, 1.0));
    assert_eq!(Align::default().factors(), (0.5, 0.5));
}
