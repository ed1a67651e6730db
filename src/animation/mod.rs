pub(crate) mod clock;
pub(crate) mod ease;
pub(crate) mod effects;
pub(crate) mod orbit;
pub(crate) mod spin;
pub(crate) mod window;

use crate::foundation::core::FrameTime;

use clock::ClockConfig;
use effects::EffectsConfig;
use orbit::OrbitConfig;
use spin::SpinConfig;

/// Contract shared by every behavior family.
///
/// Implementations are pure functions of `(config, time)`: they hold no mutable state, so calling
/// them redundantly (tick and resize in the same frame) never causes drift.
pub trait MotionResolver {
    /// What the behavior overrides when it produces a value.
    type Override;

    /// Override for instant `t`, or `None` to fall back to the next source.
    fn resolve(&self, t: FrameTime) -> Option<Self::Override>;

    /// Whether the behavior is enabled and inside its activation window at `t`.
    fn is_active(&self, t: FrameTime) -> bool;
}

/// The optional behaviors attached to a layer.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Behaviors {
    /// Rotation override.
    pub spin: Option<SpinConfig>,
    /// Position override.
    pub orbit: Option<OrbitConfig>,
    /// Rotation override that beats spin.
    pub clock: Option<ClockConfig>,
    /// Opacity/scale adjustments.
    pub effects: Option<EffectsConfig>,
}

impl Behaviors {
    /// `true` when at least one behavior is enabled (the layer needs per-frame work at some time).
    pub fn is_animated(&self) -> bool {
        self.spin.as_ref().is_some_and(|b| b.enabled)
            || self.orbit.as_ref().is_some_and(|b| b.enabled)
            || self.clock.as_ref().is_some_and(|b| b.enabled)
            || self.effects.as_ref().is_some_and(|b| b.enabled)
    }

    /// `true` when at least one behavior is active at `t`.
    pub fn is_active(&self, t: FrameTime) -> bool {
        self.spin.as_ref().is_some_and(|b| b.is_active(t))
            || self.orbit.as_ref().is_some_and(|b| b.is_active(t))
            || self.clock.as_ref().is_some_and(|b| b.is_active(t))
            || self.effects.as_ref().is_some_and(|b| b.is_active(t))
    }
}
