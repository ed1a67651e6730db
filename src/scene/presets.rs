use std::collections::BTreeMap;

use crate::{
    animation::clock::ClockHand,
    animation::ease::Ease,
    animation::window::Direction,
    scene::model::{
        ClockDef, EffectDef, EffectKindDef, EffectsDef, Loose, OrbitDef, PresetDef, SpinDef,
        VecDef,
    },
    scene::normalize::ConfigWarning,
};

fn set<T>(v: T) -> Option<Loose<T>> {
    Some(Loose::Valid(v))
}

fn preset(name: &str, description: &str) -> PresetDef {
    PresetDef {
        name: name.to_owned(),
        description: Some(description.to_owned()),
        spin: None,
        orbit: None,
        clock: None,
        effects: None,
    }
}

fn spin_preset(name: &str, description: &str, spin: SpinDef) -> PresetDef {
    PresetDef {
        spin: Some(spin),
        ..preset(name, description)
    }
}

fn clock_preset(name: &str, hand: ClockHand) -> PresetDef {
    PresetDef {
        clock: Some(ClockDef {
            enable: set(true),
            hand: set(hand),
            ..ClockDef::default()
        }),
        ..preset(name, "clock hand synced to local time")
    }
}

fn effect_preset(name: &str, description: &str, item: EffectDef) -> PresetDef {
    PresetDef {
        effects: Some(EffectsDef {
            enable: set(true),
            items: vec![Loose::Valid(item)],
        }),
        ..preset(name, description)
    }
}

/// Named behavior variants available to layers via `"preset": "<name>"`.
///
/// Explicit layer fields always win over preset fields.
#[derive(Clone, Debug, Default)]
pub struct PresetLibrary {
    presets: BTreeMap<String, PresetDef>,
}

impl PresetLibrary {
    /// Library with no presets.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Presets shipped with the crate.
    pub fn builtin() -> Self {
        let defs = [
            spin_preset(
                "spin-slow",
                "one clockwise revolution per minute",
                SpinDef {
                    enable: set(true),
                    period_sec: set(60.0),
                    ..SpinDef::default()
                },
            ),
            spin_preset(
                "spin-fast-ccw",
                "half a counter-clockwise revolution per second",
                SpinDef {
                    enable: set(true),
                    speed_deg_per_sec: set(180.0),
                    direction: set(Direction::Ccw),
                    ..SpinDef::default()
                },
            ),
            PresetDef {
                orbit: Some(OrbitDef {
                    enable: set(true),
                    radius: Some(VecDef::Uniform(24.0)),
                    period_sec: set(8.0),
                    ..OrbitDef::default()
                }),
                ..preset("orbit-small", "24px circle every 8 seconds")
            },
            effect_preset(
                "pulse",
                "gentle 5% breathing scale",
                EffectDef {
                    kind: set(EffectKindDef::Pulse),
                    amplitude: set(0.05),
                    frequency_hz: set(0.5),
                    ..EffectDef::default()
                },
            ),
            effect_preset(
                "fade-in",
                "fade from transparent over 800ms",
                EffectDef {
                    kind: set(EffectKindDef::Fade),
                    from: set(0.0),
                    to: set(1.0),
                    fade_ms: set(800.0),
                    ease: set(Ease::OutCubic),
                    ..EffectDef::default()
                },
            ),
            clock_preset("clock-hour", ClockHand::Hour),
            clock_preset("clock-minute", ClockHand::Minute),
            clock_preset("clock-second", ClockHand::Second),
        ];

        let mut lib = Self::empty();
        for def in defs {
            lib.insert(def);
        }
        lib
    }

    /// Built-ins overlaid with scene-supplied presets.
    ///
    /// Malformed entries are skipped with a warning.
    pub fn with_scene_presets(
        defs: &[Loose<PresetDef>],
        warnings: &mut Vec<ConfigWarning>,
    ) -> Self {
        let mut lib = Self::builtin();
        for (i, def) in defs.iter().enumerate() {
            match def {
                Loose::Valid(def) => {
                    if lib.presets.contains_key(&def.name) {
                        tracing::debug!(name = %def.name, "scene preset overrides built-in");
                    }
                    lib.insert(def.clone());
                }
                Loose::Invalid(raw) => warnings.push(ConfigWarning::new(
                    None,
                    format!("presets[{i}]"),
                    format!("ignored malformed preset {raw}"),
                )),
            }
        }
        lib
    }

    /// Add or replace a preset.
    pub fn insert(&mut self, def: PresetDef) {
        self.presets.insert(def.name.clone(), def);
    }

    /// Lookup by name.
    pub fn get(&self, name: &str) -> Option<&PresetDef> {
        self.presets.get(name)
    }

    /// Presets in name order.
    pub fn iter(&self) -> impl Iterator<Item = &PresetDef> {
        self.presets.values()
    }

    /// Number of presets.
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    /// Return `true` when the library holds no presets.
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/presets.rs"]
mod tests;
