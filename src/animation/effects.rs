use std::f64::consts::TAU;

use crate::{
    animation::MotionResolver,
    animation::ease::Ease,
    animation::window::ActivationWindow,
    foundation::core::{FrameTime, Vec2},
    foundation::math::lerp,
};

/// Upper bound for pulse, blink and flicker frequencies.
pub const MAX_EFFECT_FREQUENCY_HZ: f64 = 240.0;

/// Time-driven adjustments to opacity and scale.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct EffectsConfig {
    /// Master switch for the whole stack.
    pub enabled: bool,
    /// Per-layer noise seed (derived from the layer id).
    pub seed: u64,
    /// Effects applied in declaration order.
    pub items: Vec<EffectItem>,
}

/// One effect plus its own activation window.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct EffectItem {
    /// What the effect does.
    pub kind: EffectKind,
    /// When it runs.
    pub window: ActivationWindow,
}

/// Supported property effects.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EffectKind {
    /// Uniform scale oscillation: `scale * (1 + amplitude * sin(2π f t))`.
    Pulse {
        /// Relative amplitude.
        amplitude: f64,
        /// Oscillation frequency.
        frequency_hz: f64,
    },
    /// Opacity ramp from `from` to `to` over `duration_secs`, then held.
    Fade {
        /// Opacity factor at the start.
        from: f64,
        /// Opacity factor at the end.
        to: f64,
        /// Ramp length.
        duration_secs: f64,
        /// Ramp curve.
        ease: Ease,
    },
    /// Square-wave opacity: full for `duty` of each period, `low` otherwise.
    Blink {
        /// Blinks per second.
        frequency_hz: f64,
        /// Fraction of each period spent fully visible.
        duty: f64,
        /// Opacity factor while "off".
        low: f64,
    },
    /// Deterministic value-noise dimming, subtracted from opacity.
    Flicker {
        /// Maximum opacity subtracted.
        amount: f64,
        /// Noise sample rate.
        frequency_hz: f64,
    },
}

/// Combined effect output, applied after position and rotation are final.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct PropertyAdjust {
    /// Multiplier applied to the base opacity.
    pub opacity_mul: f64,
    /// Added after the multiplier.
    pub opacity_add: f64,
    /// Per-axis scale multiplier.
    pub scale_mul: Vec2,
}

impl Default for PropertyAdjust {
    fn default() -> Self {
        Self {
            opacity_mul: 1.0,
            opacity_add: 0.0,
            scale_mul: Vec2::new(1.0, 1.0),
        }
    }
}

impl PropertyAdjust {
    /// Apply to a base opacity/scale pair. Opacity is clamped to `[0, 1]`.
    pub fn apply(&self, opacity: f64, scale: Vec2) -> (f64, Vec2) {
        let o = (opacity * self.opacity_mul + self.opacity_add).clamp(0.0, 1.0);
        let s = Vec2::new(scale.x * self.scale_mul.x, scale.y * self.scale_mul.y);
        (o, s)
    }
}

impl EffectsConfig {
    /// Fold every active item into one adjustment.
    pub fn adjust(&self, elapsed_secs: f64) -> Option<PropertyAdjust> {
        if !self.enabled {
            return None;
        }

        let mut out = PropertyAdjust::default();
        let mut any = false;
        for (i, item) in self.items.iter().enumerate() {
            if !item.window.is_open(elapsed_secs) {
                continue;
            }
            any = true;
            let t = item.window.local_secs(elapsed_secs);
            apply_item(&item.kind, t, self.seed ^ (i as u64), &mut out);
        }

        any.then_some(out)
    }
}

fn apply_item(kind: &EffectKind, t: f64, seed: u64, out: &mut PropertyAdjust) {
    match *kind {
        EffectKind::Pulse {
            amplitude,
            frequency_hz,
        } => {
            let k = 1.0 + amplitude * (TAU * frequency_hz * t).sin();
            out.scale_mul = out.scale_mul * k;
        }
        EffectKind::Fade {
            from,
            to,
            duration_secs,
            ease,
        } => {
            let p = if duration_secs > 0.0 {
                ease.apply(t / duration_secs)
            } else {
                1.0
            };
            out.opacity_mul *= lerp(from, to, p);
        }
        EffectKind::Blink {
            frequency_hz,
            duty,
            low,
        } => {
            if frequency_hz > 0.0 {
                let phase = (t * frequency_hz).fract();
                if phase >= duty {
                    out.opacity_mul *= low;
                }
            }
        }
        EffectKind::Flicker {
            amount,
            frequency_hz,
        } => {
            out.opacity_add -= amount * value_noise01(seed, t * frequency_hz.max(0.0));
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Rng64 {
    state: u64,
}

impl Rng64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        // SplitMix64
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f64_01(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / ((1u64 << 53) as f64))
    }
}

fn lattice01(seed: u64, x: u64) -> f64 {
    Rng64::new(seed ^ x.wrapping_mul(0xD6E8_FEB8_6659_FD93)).next_f64_01()
}

/// Lattice period of the flicker noise; indices wrap so huge `t * frequency` stays finite.
const NOISE_PERIOD: u64 = 1 << 32;

fn value_noise01(seed: u64, x: f64) -> f64 {
    if !x.is_finite() {
        return lattice01(seed, 0);
    }
    let i0 = x.floor();
    let t = x - i0;
    let i0u = (i0.rem_euclid(NOISE_PERIOD as f64) as u64) % NOISE_PERIOD;
    let i1u = i0u.wrapping_add(1) % NOISE_PERIOD;
    lerp(lattice01(seed, i0u), lattice01(seed, i1u), t)
}

impl MotionResolver for EffectsConfig {
    type Override = PropertyAdjust;

    fn resolve(&self, t: FrameTime) -> Option<PropertyAdjust> {
        self.adjust(t.elapsed_secs)
    }

    fn is_active(&self, t: FrameTime) -> bool {
        self.enabled
            && self
                .items
                .iter()
                .any(|item| item.window.is_open(t.elapsed_secs))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/effects.rs"]
mod tests;
