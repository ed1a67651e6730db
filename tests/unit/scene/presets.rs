use super::*;

#[test]
fn builtin_names_are_sorted_and_complete() {
    let lib = PresetLibrary::builtin();
    let names: Vec<&str> = lib.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "clock-hour",
            "clock-minute",
            "clock-second",
            "fade-in",
            "orbit-small",
            "pulse",
            "spin-fast-ccw",
            "spin-slow",
        ]
    );
    assert!(lib.get("spin-slow").unwrap().spin.is_some());
    assert!(lib.get("nope").is_none());
}

#[test]
fn scene_presets_override_and_bad_entries_warn() {
    let defs: Vec<Loose<PresetDef>> = serde_json::from_value(serde_json::json!([
        { "name": "spin-slow", "spin": { "enable": true, "speedDegPerSec": 1 } },
        { "name": "wobble", "orbit": { "enable": true, "radius": [3, 1] } },
        { "spin": {} },
        42
    ]))
    .unwrap();

    let mut warnings = Vec::new();
    let lib = PresetLibrary::with_scene_presets(&defs, &mut warnings);
    assert_eq!(warnings.len(), 2);
    assert_eq!(lib.len(), PresetLibrary::builtin().len() + 1);

    let spin = lib.get("spin-slow").unwrap().spin.as_ref().unwrap();
    assert_eq!(spin.speed_deg_per_sec, Some(Loose::Valid(1.0)));
    assert!(spin.period_sec.is_none());
    assert!(lib.get("wobble").is_some());
}
