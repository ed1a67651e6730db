/// Rotation sense for angular behaviors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Clockwise (positive angles, screen y-down).
    #[default]
    Cw,
    /// Counter-clockwise.
    Ccw,
}

impl Direction {
    /// `+1` for clockwise, `-1` for counter-clockwise.
    pub fn sign(self) -> f64 {
        match self {
            Self::Cw => 1.0,
            Self::Ccw => -1.0,
        }
    }
}

/// Half-open activation interval `[start_delay, start_delay + duration)` measured from `epoch`.
///
/// A zero duration means the window never closes.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct ActivationWindow {
    /// Reference instant in scene seconds.
    pub epoch_secs: f64,
    /// Delay after the epoch before the behavior starts.
    pub start_delay_secs: f64,
    /// Active length; `0` is unbounded.
    pub duration_secs: f64,
}

impl ActivationWindow {
    /// Window that opens at scene start and never closes.
    pub const ALWAYS: Self = Self {
        epoch_secs: 0.0,
        start_delay_secs: 0.0,
        duration_secs: 0.0,
    };

    /// Return `true` when `elapsed_secs` falls inside the window.
    pub fn is_open(&self, elapsed_secs: f64) -> bool {
        let local = elapsed_secs - self.epoch_secs;
        if local < self.start_delay_secs {
            return false;
        }
        self.duration_secs <= 0.0 || local < self.start_delay_secs + self.duration_secs
    }

    /// Seconds since the window opened, floored at zero.
    pub fn local_secs(&self, elapsed_secs: f64) -> f64 {
        (elapsed_secs - self.epoch_secs - self.start_delay_secs).max(0.0)
    }
}

/// Resolve an angular speed in degrees per second.
///
/// `speed_deg_per_sec` wins whenever it is finite; otherwise a positive `period_secs` yields one
/// revolution per period; otherwise the behavior is stationary.
pub fn resolve_speed(speed_deg_per_sec: Option<f64>, period_secs: Option<f64>) -> f64 {
    if let Some(s) = speed_deg_per_sec
        && s.is_finite()
    {
        return s;
    }
    match period_secs {
        Some(p) if p.is_finite() && p > 0.0 => 360.0 / p,
        _ => 0.0,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/window.rs"]
mod tests;
