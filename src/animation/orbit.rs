use crate::{
    animation::MotionResolver,
    animation::window::{ActivationWindow, Direction, resolve_speed},
    foundation::core::{FrameTime, Vec2},
    foundation::math::normalize360,
};

/// Elliptical motion of the layer's position around a center.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct OrbitConfig {
    /// Master switch.
    pub enabled: bool,
    /// Radii along x and y.
    pub radius: Vec2,
    /// Absolute orbit center in stage coordinates; `None` orbits the base position.
    pub center: Option<Vec2>,
    /// Angular speed in degrees per second. Takes precedence over `period_secs`.
    pub speed_deg_per_sec: Option<f64>,
    /// Seconds per revolution; ignored unless `> 0`.
    pub period_secs: Option<f64>,
    /// Orbit sense.
    pub direction: Direction,
    /// Starting angle in degrees (`0` is the +x axis).
    pub phase_deg: f64,
    /// When the orbit is allowed to run.
    pub window: ActivationWindow,
}

/// Derived orbit state at one instant.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct OrbitState {
    /// Mirrors [`OrbitConfig::enabled`].
    pub enabled: bool,
    /// The activation window is open.
    pub active: bool,
    /// Orbit angle in `[0, 360)` when moving.
    pub angle_deg: Option<f64>,
    /// Offset from the orbit center when moving.
    pub offset: Option<Vec2>,
}

impl OrbitConfig {
    /// Evaluate the orbit at `elapsed_secs`.
    pub fn state(&self, elapsed_secs: f64) -> OrbitState {
        if !self.enabled {
            return OrbitState {
                enabled: false,
                active: false,
                angle_deg: None,
                offset: None,
            };
        }

        let velocity =
            resolve_speed(self.speed_deg_per_sec, self.period_secs) * self.direction.sign();
        let active = self.window.is_open(elapsed_secs);
        if !active || velocity == 0.0 {
            return OrbitState {
                enabled: true,
                active,
                angle_deg: None,
                offset: None,
            };
        }

        let t = self.window.local_secs(elapsed_secs);
        let angle = normalize360(self.phase_deg + velocity * t);
        let (sin, cos) = angle.to_radians().sin_cos();
        OrbitState {
            enabled: true,
            active,
            angle_deg: Some(angle),
            offset: Some(Vec2::new(self.radius.x * cos, self.radius.y * sin)),
        }
    }

    /// Absolute position of the orbiting layer given its base position.
    pub fn position(&self, base: Vec2, t: FrameTime) -> Option<Vec2> {
        let offset = self.resolve(t)?;
        Some(self.center.unwrap_or(base) + offset)
    }
}

impl MotionResolver for OrbitConfig {
    type Override = Vec2;

    fn resolve(&self, t: FrameTime) -> Option<Vec2> {
        self.state(t.elapsed_secs).offset
    }

    fn is_active(&self, t: FrameTime) -> bool {
        self.enabled && self.window.is_open(t.elapsed_secs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/orbit.rs"]
mod tests;
