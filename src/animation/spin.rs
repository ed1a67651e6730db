use crate::{
    animation::MotionResolver,
    animation::window::{ActivationWindow, Direction, resolve_speed},
    foundation::core::FrameTime,
    foundation::math::normalize360,
};

/// Continuous rotation about the layer's anchor.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct SpinConfig {
    /// Master switch; a disabled spin is inert.
    pub enabled: bool,
    /// Angular speed in degrees per second. Takes precedence over `period_secs`.
    pub speed_deg_per_sec: Option<f64>,
    /// Seconds per revolution; ignored unless `> 0`.
    pub period_secs: Option<f64>,
    /// Rotation sense.
    pub direction: Direction,
    /// Static angle added after integration.
    pub offset_deg: f64,
    /// When the spin is allowed to run.
    pub window: ActivationWindow,
}

/// Derived spin state at one instant. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct SpinState {
    /// Mirrors [`SpinConfig::enabled`].
    pub enabled: bool,
    /// The activation window is open.
    pub active: bool,
    /// Angle in `[0, 360)`; `None` means "use the manual angle".
    pub angle_deg: Option<f64>,
    /// Signed angular velocity in degrees per second.
    pub angular_velocity: f64,
    /// Elapsed scene seconds the state was computed for.
    pub elapsed_secs: f64,
}

impl SpinConfig {
    /// Signed speed after direction is applied.
    pub fn signed_speed(&self) -> f64 {
        resolve_speed(self.speed_deg_per_sec, self.period_secs) * self.direction.sign()
    }

    /// Evaluate the spin at `elapsed_secs`.
    pub fn state(&self, elapsed_secs: f64) -> SpinState {
        if !self.enabled {
            return SpinState {
                enabled: false,
                active: false,
                angle_deg: None,
                angular_velocity: 0.0,
                elapsed_secs,
            };
        }

        let velocity = self.signed_speed();
        let active = self.window.is_open(elapsed_secs);
        let angle_deg = if active && velocity != 0.0 {
            let t = self.window.local_secs(elapsed_secs);
            Some(normalize360(velocity * t + self.offset_deg))
        } else {
            None
        };

        SpinState {
            enabled: true,
            active,
            angle_deg,
            angular_velocity: velocity,
            elapsed_secs,
        }
    }
}

impl MotionResolver for SpinConfig {
    type Override = f64;

    fn resolve(&self, t: FrameTime) -> Option<f64> {
        self.state(t.elapsed_secs).angle_deg
    }

    fn is_active(&self, t: FrameTime) -> bool {
        self.enabled && self.window.is_open(t.elapsed_secs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/spin.rs"]
mod tests;
