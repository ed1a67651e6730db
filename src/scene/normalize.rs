use std::collections::{BTreeSet, HashSet};

use crate::{
    animation::Behaviors,
    animation::clock::ClockConfig,
    animation::ease::Ease,
    animation::effects::{EffectItem, EffectKind, EffectsConfig, MAX_EFFECT_FREQUENCY_HZ},
    animation::orbit::OrbitConfig,
    animation::spin::SpinConfig,
    animation::window::ActivationWindow,
    foundation::core::{StageOrigin, Vec2},
    foundation::math::stable_hash64,
    scene::model::{
        Align, ClockDef, EffectDef, EffectKindDef, EffectsDef, Fit, LayerDef, Loose, OrbitDef,
        SceneConfig, SpinDef, VecDef,
    },
    scene::presets::PresetLibrary,
};

/// Newest scene schema this crate understands.
pub const SCENE_SCHEMA_VERSION: u32 = 1;

/// Non-fatal configuration problem; a default was applied in its place.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ConfigWarning {
    /// Layer the problem belongs to, if any.
    pub layer: Option<String>,
    /// JSON field path relative to the layer (or document).
    pub field: String,
    /// Human readable description.
    pub message: String,
}

impl ConfigWarning {
    /// Construct a warning.
    pub fn new(layer: Option<String>, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            layer,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.layer {
            Some(layer) => write!(f, "layer '{layer}' {}: {}", self.field, self.message),
            None => write!(f, "{}: {}", self.field, self.message),
        }
    }
}

/// Logical image reference of a layer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ImageRef {
    /// Direct URL or bundled-asset path.
    Source(String),
    /// Id looked up in the image registry.
    Registry(String),
    /// Layer names no image.
    None,
}

/// Canonical layer record.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct NormalizedLayer {
    /// Unique id within the scene.
    pub id: String,
    /// Paint order.
    pub order: i64,
    /// Declaration index, the ordering tie-break.
    pub index: usize,
    /// Base position in stage units.
    pub position: Vec2,
    /// Base scale.
    pub scale: Vec2,
    /// Manual rotation in radians.
    pub rotation_rad: f64,
    /// Image reference.
    pub image: ImageRef,
    /// Visibility flag.
    pub visible: bool,
    /// Base opacity in `[0, 1]`.
    pub opacity: f64,
    /// Anchor point.
    pub anchor: Vec2,
    /// Fit mode.
    pub fit: Fit,
    /// Alignment.
    pub align: Align,
    /// Explicit box width.
    pub width: Option<f64>,
    /// Explicit box height.
    pub height: Option<f64>,
    /// Time-driven behaviors.
    pub behaviors: Behaviors,
}

/// Normalizer output: layers sorted by `(order, index)` plus every warning produced.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct NormalizedScene {
    /// Schema version the document declared.
    pub version: u32,
    /// Stage origin.
    pub origin: StageOrigin,
    /// Layers in paint order.
    pub layers: Vec<NormalizedLayer>,
    /// Problems replaced by defaults.
    pub warnings: Vec<ConfigWarning>,
}

/// Normalize a scene using the built-in presets plus any the scene declares.
///
/// Total: malformed optional input becomes a [`ConfigWarning`] and a default.
pub fn normalize_scene(cfg: &SceneConfig) -> NormalizedScene {
    let mut warnings = Vec::new();
    let presets = PresetLibrary::with_scene_presets(&cfg.presets, &mut warnings);
    normalize_scene_with(cfg, &presets, warnings)
}

/// Normalize against an explicit preset library, appending to `warnings`.
pub fn normalize_scene_with(
    cfg: &SceneConfig,
    presets: &PresetLibrary,
    warnings: Vec<ConfigWarning>,
) -> NormalizedScene {
    let mut cx = Normalizer {
        layer: None,
        warnings,
        deprecated: BTreeSet::new(),
    };

    let version = match cx.value("version", &cfg.version) {
        Some(v) if v > SCENE_SCHEMA_VERSION => {
            cx.warn(
                "version",
                format!("schema version {v} is newer than {SCENE_SCHEMA_VERSION}; reading anyway"),
            );
            v
        }
        Some(v) => v,
        None => SCENE_SCHEMA_VERSION,
    };
    let origin = cx.value("origin", &cfg.origin).unwrap_or_default();

    let mut seen = HashSet::new();
    let mut layers = Vec::with_capacity(cfg.layers.len());
    for (index, def) in cfg.layers.iter().enumerate() {
        cx.layer = None;
        match def {
            Loose::Valid(def) => layers.push(cx.normalize_layer(index, def, presets, &mut seen)),
            Loose::Invalid(raw) => cx.warn(
                format!("layers[{index}]"),
                format!("ignored malformed layer {raw}"),
            ),
        }
    }
    // Stable: equal orders keep declaration order.
    layers.sort_by_key(|l| l.order);

    NormalizedScene {
        version,
        origin,
        layers,
        warnings: cx.warnings,
    }
}

struct Normalizer {
    layer: Option<String>,
    warnings: Vec<ConfigWarning>,
    deprecated: BTreeSet<&'static str>,
}

impl Normalizer {
    fn warn(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let w = ConfigWarning::new(self.layer.clone(), field, message);
        tracing::warn!(warning = %w, "config warning");
        self.warnings.push(w);
    }

    fn deprecated(&mut self, field: &'static str, replacement: &str) {
        if self.deprecated.insert(field) {
            let w = ConfigWarning::new(
                None,
                field,
                format!("deprecated; use '{replacement}' instead"),
            );
            tracing::warn!(field, replacement, "deprecated scene field");
            self.warnings.push(w);
        }
    }

    fn value<T: Clone>(&mut self, field: &str, v: &Option<Loose<T>>) -> Option<T> {
        match v {
            None => None,
            Some(Loose::Valid(v)) => Some(v.clone()),
            Some(Loose::Invalid(raw)) => {
                self.warn(field, format!("invalid value {raw}; using default"));
                None
            }
        }
    }

    fn number(&mut self, field: &str, v: &Option<Loose<f64>>) -> Option<f64> {
        match self.value(field, v) {
            Some(n) if n.is_finite() => Some(n),
            Some(n) => {
                self.warn(field, format!("non-finite value {n}; using default"));
                None
            }
            None => None,
        }
    }

    fn non_negative(&mut self, field: &str, v: &Option<Loose<f64>>) -> f64 {
        match self.number(field, v) {
            Some(n) if n < 0.0 => {
                self.warn(field, format!("negative value {n} clamped to 0"));
                0.0
            }
            Some(n) => n,
            None => 0.0,
        }
    }

    fn size(&mut self, field: &str, v: &Option<Loose<f64>>) -> Option<f64> {
        match self.number(field, v) {
            Some(n) if n <= 0.0 => {
                self.warn(field, format!("{n} is not a positive size; ignoring"));
                None
            }
            other => other,
        }
    }

    fn vector(&mut self, field: &str, v: &Option<VecDef>, default: Vec2) -> Vec2 {
        match v {
            None => default,
            Some(VecDef::Uniform(n)) if n.is_finite() => Vec2::new(*n, *n),
            Some(VecDef::Pair(x, y)) if x.is_finite() && y.is_finite() => Vec2::new(*x, *y),
            Some(other) => {
                self.warn(
                    field,
                    format!("expected number, [x, y] or {{x, y}}, got {other:?}; using default"),
                );
                default
            }
        }
    }

    fn window(
        &mut self,
        prefix: &str,
        epoch: &Option<Loose<f64>>,
        start_delay_ms: &Option<Loose<f64>>,
        duration_ms: &Option<Loose<f64>>,
    ) -> ActivationWindow {
        ActivationWindow {
            epoch_secs: self.number(&format!("{prefix}.epoch"), epoch).unwrap_or(0.0),
            start_delay_secs: self.non_negative(&format!("{prefix}.startDelay"), start_delay_ms)
                / 1000.0,
            duration_secs: self.non_negative(&format!("{prefix}.duration"), duration_ms) / 1000.0,
        }
    }

    fn layer_id(&mut self, index: usize, def: &LayerDef, seen: &mut HashSet<String>) -> String {
        let authored = match self.value("id", &def.id) {
            Some(id) if !id.trim().is_empty() => Some(id.trim().to_owned()),
            Some(_) => {
                self.warn(format!("layers[{index}].id"), "empty id; generating one");
                None
            }
            None => None,
        };
        let base = authored.unwrap_or_else(|| format!("layer-{index}"));
        if seen.insert(base.clone()) {
            return base;
        }

        let mut n = 2usize;
        let id = loop {
            let candidate = format!("{base}-{n}");
            if seen.insert(candidate.clone()) {
                break candidate;
            }
            n += 1;
        };
        self.warn(
            format!("layers[{index}].id"),
            format!("duplicate id '{base}' renamed to '{id}'"),
        );
        id
    }

    fn normalize_layer(
        &mut self,
        index: usize,
        def: &LayerDef,
        presets: &PresetLibrary,
        seen: &mut HashSet<String>,
    ) -> NormalizedLayer {
        let id = self.layer_id(index, def, seen);
        self.layer = Some(id.clone());

        let order = match self.value("order", &def.order) {
            Some(o) => o,
            None => match self.value("z", &def.z) {
                Some(z) => {
                    self.deprecated("z", "order");
                    z
                }
                None => 0,
            },
        };

        let rotation_rad = if let Some(r) = self.number("rotation", &def.rotation) {
            r
        } else if let Some(r) = self.number("rotationRad", &def.rotation_rad) {
            self.deprecated("rotationRad", "rotation");
            r
        } else if let Some(d) = self.number("rotationDeg", &def.rotation_deg) {
            d.to_radians()
        } else {
            0.0
        };

        let src = self.value("src", &def.src).filter(|s| !s.trim().is_empty());
        let image_id = self
            .value("imageId", &def.image_id)
            .filter(|s| !s.trim().is_empty());
        let image = match (src, image_id) {
            (Some(src), _) => ImageRef::Source(src),
            (None, Some(id)) => ImageRef::Registry(id),
            (None, None) => ImageRef::None,
        };

        let opacity = match self.number("opacity", &def.opacity) {
            Some(o) if !(0.0..=1.0).contains(&o) => {
                self.warn("opacity", format!("{o} clamped to [0, 1]"));
                o.clamp(0.0, 1.0)
            }
            Some(o) => o,
            None => 1.0,
        };

        let width = self.size("width", &def.width);
        let height = self.size("height", &def.height);

        let behaviors = self.behaviors(&id, def, presets);

        NormalizedLayer {
            id,
            order,
            index,
            position: Vec2::new(
                self.number("x", &def.x).unwrap_or(0.0),
                self.number("y", &def.y).unwrap_or(0.0),
            ),
            scale: self.vector("scale", &def.scale, Vec2::new(1.0, 1.0)),
            rotation_rad,
            image,
            visible: self.value("visible", &def.visible).unwrap_or(true),
            opacity,
            anchor: self.vector("anchor", &def.anchor, Vec2::ZERO),
            fit: self.value("fit", &def.fit).unwrap_or_default(),
            align: self.value("align", &def.align).unwrap_or_default(),
            width,
            height,
            behaviors,
        }
    }

    fn behaviors(&mut self, id: &str, def: &LayerDef, presets: &PresetLibrary) -> Behaviors {
        let preset = match self.value("preset", &def.preset) {
            Some(name) => {
                let found = presets.get(&name);
                if found.is_none() {
                    self.warn("preset", format!("unknown preset '{name}'"));
                }
                found
            }
            None => None,
        };

        let spin = self.value("spin", &def.spin);
        let spin = merge(spin, preset.and_then(|p| p.spin.as_ref()), SpinDef::merged_over);
        let orbit = self.value("orbit", &def.orbit);
        let orbit = merge(orbit, preset.and_then(|p| p.orbit.as_ref()), OrbitDef::merged_over);
        let clock = self.value("clock", &def.clock);
        let clock = merge(clock, preset.and_then(|p| p.clock.as_ref()), ClockDef::merged_over);
        let effects = self.value("effects", &def.effects);
        let effects = merge(
            effects,
            preset.and_then(|p| p.effects.as_ref()),
            EffectsDef::merged_over,
        );

        Behaviors {
            spin: spin.map(|d| self.spin(&d)),
            orbit: orbit.map(|d| self.orbit(&d)),
            clock: clock.map(|d| self.clock(&d)),
            effects: effects.map(|d| self.effects(id, &d)),
        }
    }

    fn spin(&mut self, d: &SpinDef) -> SpinConfig {
        SpinConfig {
            enabled: self.value("spin.enable", &d.enable).unwrap_or(false),
            speed_deg_per_sec: self.number("spin.speedDegPerSec", &d.speed_deg_per_sec),
            period_secs: self.number("spin.periodSec", &d.period_sec),
            direction: self.value("spin.direction", &d.direction).unwrap_or_default(),
            offset_deg: self.number("spin.offsetDeg", &d.offset_deg).unwrap_or(0.0),
            window: self.window("spin", &d.epoch, &d.start_delay, &d.duration),
        }
    }

    fn orbit(&mut self, d: &OrbitDef) -> OrbitConfig {
        OrbitConfig {
            enabled: self.value("orbit.enable", &d.enable).unwrap_or(false),
            radius: self.vector("orbit.radius", &d.radius, Vec2::ZERO),
            center: d
                .center
                .as_ref()
                .map(|_| self.vector("orbit.center", &d.center, Vec2::ZERO)),
            speed_deg_per_sec: self.number("orbit.speedDegPerSec", &d.speed_deg_per_sec),
            period_secs: self.number("orbit.periodSec", &d.period_sec),
            direction: self.value("orbit.direction", &d.direction).unwrap_or_default(),
            phase_deg: self.number("orbit.phaseDeg", &d.phase_deg).unwrap_or(0.0),
            window: self.window("orbit", &d.epoch, &d.start_delay, &d.duration),
        }
    }

    fn clock(&mut self, d: &ClockDef) -> ClockConfig {
        let defaults = ClockConfig::default();
        ClockConfig {
            enabled: self.value("clock.enable", &d.enable).unwrap_or(false),
            hand: self.value("clock.hand", &d.hand).unwrap_or(defaults.hand),
            smooth: self.value("clock.smooth", &d.smooth).unwrap_or(defaults.smooth),
            utc_offset_minutes: self
                .number("clock.utcOffsetMinutes", &d.utc_offset_minutes)
                .unwrap_or(defaults.utc_offset_minutes),
            offset_deg: self
                .number("clock.offsetDeg", &d.offset_deg)
                .unwrap_or(defaults.offset_deg),
        }
    }

    fn effects(&mut self, id: &str, d: &EffectsDef) -> EffectsConfig {
        let mut items = Vec::with_capacity(d.items.len());
        for (i, item) in d.items.iter().enumerate() {
            let field = format!("effects.items[{i}]");
            match item {
                Loose::Valid(item) => {
                    if let Some(item) = self.effect(&field, item) {
                        items.push(item);
                    }
                }
                Loose::Invalid(raw) => self.warn(field, format!("ignored malformed effect {raw}")),
            }
        }
        EffectsConfig {
            enabled: self.value("effects.enable", &d.enable).unwrap_or(false),
            seed: stable_hash64(id),
            items,
        }
    }

    fn param(&mut self, field: &str, name: &str, v: &Option<Loose<f64>>, default: f64) -> f64 {
        self.number(&format!("{field}.{name}"), v).unwrap_or(default)
    }

    fn frequency(&mut self, field: &str, v: &Option<Loose<f64>>) -> f64 {
        let name = format!("{field}.frequencyHz");
        match self.number(&name, v) {
            None => 1.0,
            Some(f) if f <= 0.0 => {
                self.warn(name, format!("{f} is not a positive frequency; using 1"));
                1.0
            }
            Some(f) if f > MAX_EFFECT_FREQUENCY_HZ => {
                self.warn(
                    name,
                    format!("{f} clamped to {MAX_EFFECT_FREQUENCY_HZ}"),
                );
                MAX_EFFECT_FREQUENCY_HZ
            }
            Some(f) => f,
        }
    }

    fn effect(&mut self, field: &str, d: &EffectDef) -> Option<EffectItem> {
        let Some(kind) = self.value(&format!("{field}.kind"), &d.kind) else {
            self.warn(field, "effect without a known kind dropped");
            return None;
        };

        let kind = match kind {
            EffectKindDef::Pulse => EffectKind::Pulse {
                amplitude: self.param(field, "amplitude", &d.amplitude, 0.05),
                frequency_hz: self.frequency(field, &d.frequency_hz),
            },
            EffectKindDef::Fade => EffectKind::Fade {
                from: self.param(field, "from", &d.from, 0.0),
                to: self.param(field, "to", &d.to, 1.0),
                duration_secs: self.param(field, "fadeMs", &d.fade_ms, 1000.0).max(0.0) / 1000.0,
                ease: self
                    .value(&format!("{field}.ease"), &d.ease)
                    .unwrap_or(Ease::Linear),
            },
            EffectKindDef::Blink => EffectKind::Blink {
                frequency_hz: self.frequency(field, &d.frequency_hz),
                duty: self.param(field, "duty", &d.duty, 0.5).clamp(0.0, 1.0),
                low: self.param(field, "low", &d.low, 0.0),
            },
            EffectKindDef::Flicker => EffectKind::Flicker {
                amount: self.param(field, "amount", &d.amount, 0.2).clamp(0.0, 1.0),
                frequency_hz: self.frequency(field, &d.frequency_hz),
            },
        };

        Some(EffectItem {
            kind,
            window: self.window(field, &d.epoch, &d.start_delay, &d.duration),
        })
    }
}

fn merge<T: Clone>(own: Option<T>, preset: Option<&T>, f: impl Fn(&T, &T) -> T) -> Option<T> {
    match (own, preset) {
        (Some(own), Some(base)) => Some(f(&own, base)),
        (Some(own), None) => Some(own),
        (None, base) => base.cloned(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/normalize.rs"]
mod tests;
