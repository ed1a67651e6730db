//! Boundary schema for authored scene documents.
//!
//! Every optional field is wrapped in [`Loose`] so a malformed value degrades into a config
//! warning plus a default instead of failing the whole document. Field names mirror the JSON
//! keys (camelCase on the wire).
#![allow(missing_docs)]

use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    animation::clock::ClockHand,
    animation::ease::Ease,
    animation::window::Direction,
    foundation::core::StageOrigin,
    foundation::error::{StageError, StageResult},
};

/// A value that either parsed as `T` or is kept verbatim for a warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Loose<T> {
    /// Well-formed value.
    Valid(T),
    /// Anything else.
    Invalid(serde_json::Value),
}

/// Vector field accepting `n`, `[x, y]`, or `{ "x": .., "y": .. }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VecDef {
    /// Same value on both axes.
    Uniform(f64),
    /// Explicit pair.
    Pair(f64, f64),
    /// Unrecognized shape.
    Other(serde_json::Value),
}

impl<'de> Deserialize<'de> for VecDef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(f64),
            Arr([f64; 2]),
            Obj { x: f64, y: f64 },
            Any(serde_json::Value),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Num(v) => Self::Uniform(v),
            Repr::Arr([x, y]) => Self::Pair(x, y),
            Repr::Obj { x, y } => Self::Pair(x, y),
            Repr::Any(v) => Self::Other(v),
        })
    }
}

/// How an image is fitted into the layer box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    /// Scale to fit entirely inside the box, preserving aspect ratio.
    #[default]
    Contain,
    /// Scale to cover the box, preserving aspect ratio.
    Cover,
    /// Stretch to the box.
    Fill,
    /// Natural size.
    None,
}

/// Where a fitted image sits inside the layer box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Align {
    /// Centered on both axes.
    #[default]
    Center,
    /// Top-left corner.
    TopLeft,
    /// Top edge, horizontally centered.
    Top,
    /// Top-right corner.
    TopRight,
    /// Left edge, vertically centered.
    Left,
    /// Right edge, vertically centered.
    Right,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom edge, horizontally centered.
    Bottom,
    /// Bottom-right corner.
    BottomRight,
}

impl Align {
    /// Fractional placement of the image inside the free space, per axis.
    pub fn factors(self) -> (f64, f64) {
        match self {
            Self::Center => (0.5, 0.5),
            Self::TopLeft => (0.0, 0.0),
            Self::Top => (0.5, 0.0),
            Self::TopRight => (1.0, 0.0),
            Self::Left => (0.0, 0.5),
            Self::Right => (1.0, 0.5),
            Self::BottomLeft => (0.0, 1.0),
            Self::Bottom => (0.5, 1.0),
            Self::BottomRight => (1.0, 1.0),
        }
    }
}

/// A complete authored scene.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfig {
    /// Schema version; missing means the current version.
    #[serde(default)]
    pub version: Option<Loose<u32>>,
    /// Stage origin placement.
    #[serde(default)]
    pub origin: Option<Loose<StageOrigin>>,
    /// Layers in declaration order.
    #[serde(default)]
    pub layers: Vec<Loose<LayerDef>>,
    /// Named behavior variants, overriding built-ins with the same name.
    #[serde(default)]
    pub presets: Vec<Loose<PresetDef>>,
}

impl SceneConfig {
    /// Parse a scene from JSON text.
    pub fn from_json_str(json: &str) -> StageResult<Self> {
        serde_json::from_str(json).map_err(|e| StageError::serde(e.to_string()))
    }

    /// Read and parse a scene file.
    pub fn from_path(path: impl AsRef<Path>) -> StageResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read scene '{}'", path.display()))?;
        Self::from_json_str(&text)
    }
}

/// One authored layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDef {
    #[serde(default)]
    pub id: Option<Loose<String>>,
    #[serde(default)]
    pub order: Option<Loose<i64>>,
    /// Deprecated alias of `order`.
    #[serde(default)]
    pub z: Option<Loose<i64>>,
    #[serde(default)]
    pub x: Option<Loose<f64>>,
    #[serde(default)]
    pub y: Option<Loose<f64>>,
    #[serde(default)]
    pub scale: Option<VecDef>,
    /// Radians.
    #[serde(default)]
    pub rotation: Option<Loose<f64>>,
    /// Deprecated alias of `rotation`.
    #[serde(default)]
    pub rotation_rad: Option<Loose<f64>>,
    #[serde(default)]
    pub rotation_deg: Option<Loose<f64>>,
    #[serde(default)]
    pub src: Option<Loose<String>>,
    #[serde(default)]
    pub image_id: Option<Loose<String>>,
    #[serde(default)]
    pub visible: Option<Loose<bool>>,
    #[serde(default)]
    pub opacity: Option<Loose<f64>>,
    #[serde(default)]
    pub anchor: Option<VecDef>,
    #[serde(default)]
    pub fit: Option<Loose<Fit>>,
    #[serde(default)]
    pub align: Option<Loose<Align>>,
    #[serde(default)]
    pub width: Option<Loose<f64>>,
    #[serde(default)]
    pub height: Option<Loose<f64>>,
    #[serde(default)]
    pub preset: Option<Loose<String>>,
    #[serde(default)]
    pub spin: Option<Loose<SpinDef>>,
    #[serde(default)]
    pub orbit: Option<Loose<OrbitDef>>,
    #[serde(default)]
    pub clock: Option<Loose<ClockDef>>,
    #[serde(default)]
    pub effects: Option<Loose<EffectsDef>>,
}

/// Spin block. Times: `epoch` in seconds, `startDelay`/`duration` in milliseconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinDef {
    #[serde(default, alias = "enabled")]
    pub enable: Option<Loose<bool>>,
    #[serde(default)]
    pub speed_deg_per_sec: Option<Loose<f64>>,
    #[serde(default)]
    pub period_sec: Option<Loose<f64>>,
    #[serde(default)]
    pub direction: Option<Loose<Direction>>,
    #[serde(default)]
    pub offset_deg: Option<Loose<f64>>,
    #[serde(default)]
    pub epoch: Option<Loose<f64>>,
    #[serde(default)]
    pub start_delay: Option<Loose<f64>>,
    #[serde(default)]
    pub duration: Option<Loose<f64>>,
}

/// Orbit block. Same time units as [`SpinDef`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrbitDef {
    #[serde(default, alias = "enabled")]
    pub enable: Option<Loose<bool>>,
    #[serde(default)]
    pub radius: Option<VecDef>,
    #[serde(default)]
    pub center: Option<VecDef>,
    #[serde(default)]
    pub speed_deg_per_sec: Option<Loose<f64>>,
    #[serde(default)]
    pub period_sec: Option<Loose<f64>>,
    #[serde(default)]
    pub direction: Option<Loose<Direction>>,
    #[serde(default)]
    pub phase_deg: Option<Loose<f64>>,
    #[serde(default)]
    pub epoch: Option<Loose<f64>>,
    #[serde(default)]
    pub start_delay: Option<Loose<f64>>,
    #[serde(default)]
    pub duration: Option<Loose<f64>>,
}

/// Clock-sync block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockDef {
    #[serde(default, alias = "enabled")]
    pub enable: Option<Loose<bool>>,
    #[serde(default)]
    pub hand: Option<Loose<ClockHand>>,
    #[serde(default)]
    pub smooth: Option<Loose<bool>>,
    #[serde(default)]
    pub utc_offset_minutes: Option<Loose<f64>>,
    #[serde(default)]
    pub offset_deg: Option<Loose<f64>>,
}

/// Effects block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectsDef {
    #[serde(default, alias = "enabled")]
    pub enable: Option<Loose<bool>>,
    #[serde(default)]
    pub items: Vec<Loose<EffectDef>>,
}

/// Effect discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKindDef {
    Pulse,
    Fade,
    Blink,
    Flicker,
}

/// One effect entry; which parameters apply depends on `kind`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectDef {
    #[serde(default)]
    pub kind: Option<Loose<EffectKindDef>>,
    #[serde(default)]
    pub amplitude: Option<Loose<f64>>,
    #[serde(default)]
    pub frequency_hz: Option<Loose<f64>>,
    #[serde(default)]
    pub from: Option<Loose<f64>>,
    #[serde(default)]
    pub to: Option<Loose<f64>>,
    /// Fade ramp length in milliseconds.
    #[serde(default)]
    pub fade_ms: Option<Loose<f64>>,
    #[serde(default)]
    pub ease: Option<Loose<Ease>>,
    #[serde(default)]
    pub duty: Option<Loose<f64>>,
    #[serde(default)]
    pub low: Option<Loose<f64>>,
    #[serde(default)]
    pub amount: Option<Loose<f64>>,
    #[serde(default)]
    pub epoch: Option<Loose<f64>>,
    #[serde(default)]
    pub start_delay: Option<Loose<f64>>,
    #[serde(default)]
    pub duration: Option<Loose<f64>>,
}

/// Named behavior variant offered for selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub spin: Option<SpinDef>,
    #[serde(default)]
    pub orbit: Option<OrbitDef>,
    #[serde(default)]
    pub clock: Option<ClockDef>,
    #[serde(default)]
    pub effects: Option<EffectsDef>,
}

macro_rules! merge_fields {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $ty {
            /// Field-wise merge: values set on `self` win, gaps are filled from `base`.
            pub fn merged_over(&self, base: &Self) -> Self {
                Self {
                    $($field: self.$field.clone().or_else(|| base.$field.clone()),)*
                }
            }
        }
    };
}

merge_fields!(SpinDef {
    enable,
    speed_deg_per_sec,
    period_sec,
    direction,
    offset_deg,
    epoch,
    start_delay,
    duration,
});

merge_fields!(OrbitDef {
    enable,
    radius,
    center,
    speed_deg_per_sec,
    period_sec,
    direction,
    phase_deg,
    epoch,
    start_delay,
    duration,
});

merge_fields!(ClockDef {
    enable,
    hand,
    smooth,
    utc_offset_minutes,
    offset_deg,
});

impl EffectsDef {
    /// Layer items replace preset items wholesale; `enable` merges like other fields.
    pub fn merged_over(&self, base: &Self) -> Self {
        Self {
            enable: self.enable.clone().or_else(|| base.enable.clone()),
            items: if self.items.is_empty() {
                base.items.clone()
            } else {
                self.items.clone()
            },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
