use crate::{animation::MotionResolver, foundation::core::FrameTime, foundation::math::normalize360};

const SECS_PER_DAY: f64 = 86_400.0;

/// Which hand of an analog clock a layer represents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockHand {
    /// 12-hour hand.
    Hour,
    /// Minute hand.
    Minute,
    /// Second hand.
    #[default]
    Second,
}

/// Rotation synced to the wall-clock time of day.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ClockConfig {
    /// Master switch.
    pub enabled: bool,
    /// Hand to emulate.
    pub hand: ClockHand,
    /// Sweep continuously instead of ticking once per unit.
    pub smooth: bool,
    /// Offset from UTC in minutes.
    pub utc_offset_minutes: f64,
    /// Angle added to the computed hand angle (for artwork not drawn at 12 o'clock).
    pub offset_deg: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hand: ClockHand::Second,
            smooth: true,
            utc_offset_minutes: 0.0,
            offset_deg: 0.0,
        }
    }
}

/// Derived clock state at one instant.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ClockState {
    /// Mirrors [`ClockConfig::enabled`].
    pub enabled: bool,
    /// Hand angle in `[0, 360)`; `None` when disabled or the wall time is unusable.
    pub angle_deg: Option<f64>,
    /// Local seconds since midnight used for the angle.
    pub seconds_of_day: Option<f64>,
}

impl ClockConfig {
    /// Evaluate the hand angle for a wall-clock instant.
    pub fn state(&self, wall_secs: f64) -> ClockState {
        if !self.enabled || !wall_secs.is_finite() {
            return ClockState {
                enabled: self.enabled,
                angle_deg: None,
                seconds_of_day: None,
            };
        }

        let local = (wall_secs + self.utc_offset_minutes * 60.0).rem_euclid(SECS_PER_DAY);
        let quantize = |v: f64| if self.smooth { v } else { v.floor() };
        let angle = match self.hand {
            ClockHand::Second => quantize(local % 60.0) * 6.0,
            ClockHand::Minute => quantize((local / 60.0) % 60.0) * 6.0,
            ClockHand::Hour => quantize((local / 3_600.0) % 12.0) * 30.0,
        };

        ClockState {
            enabled: true,
            angle_deg: Some(normalize360(angle + self.offset_deg)),
            seconds_of_day: Some(local),
        }
    }
}

impl MotionResolver for ClockConfig {
    type Override = f64;

    fn resolve(&self, t: FrameTime) -> Option<f64> {
        self.state(t.wall_secs).angle_deg
    }

    fn is_active(&self, _t: FrameTime) -> bool {
        self.enabled
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/clock.rs"]
mod tests;
