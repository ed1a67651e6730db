use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::foundation::core::FrameTime;

/// Time source for a scene.
///
/// Every motion resolver derives its state from this clock instead of accumulating per-frame
/// deltas, so re-evaluating a layer any number of times is drift-free.
pub trait Clock: Send + Sync {
    /// Monotonic seconds since an arbitrary origin.
    fn now_secs(&self) -> f64;

    /// Wall-clock seconds since the Unix epoch.
    fn wall_secs(&self) -> f64;
}

/// Clock backed by [`Instant`] and [`SystemTime`].
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    /// Start a clock at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn wall_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Manually driven clock for tests and offline evaluation.
///
/// Cloning an `Arc<ManualClock>` and handing one copy to the engine lets the caller step time
/// deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now_bits: AtomicU64,
    wall_origin_bits: AtomicU64,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl ManualClock {
    /// Create a clock at `now = 0` whose wall time starts at `wall_origin_secs`.
    pub fn new(wall_origin_secs: f64) -> Self {
        Self {
            now_bits: AtomicU64::new(0f64.to_bits()),
            wall_origin_bits: AtomicU64::new(wall_origin_secs.to_bits()),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, secs: f64) {
        self.now_bits.store(secs.to_bits(), Ordering::SeqCst);
    }

    /// Step forward by `delta_secs`.
    pub fn advance(&self, delta_secs: f64) {
        self.set(self.now_secs() + delta_secs);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::SeqCst))
    }

    fn wall_secs(&self) -> f64 {
        f64::from_bits(self.wall_origin_bits.load(Ordering::SeqCst)) + self.now_secs()
    }
}

/// A clock pinned to the instant a scene started.
#[derive(Clone)]
pub struct SceneClock {
    source: Arc<dyn Clock>,
    start_secs: f64,
}

impl std::fmt::Debug for SceneClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneClock")
            .field("start_secs", &self.start_secs)
            .finish_non_exhaustive()
    }
}

impl SceneClock {
    /// Start a scene clock at the source's current time.
    pub fn start(source: Arc<dyn Clock>) -> Self {
        let start_secs = source.now_secs();
        Self { source, start_secs }
    }

    /// Restart the time base. Only a new scene build does this.
    pub fn restart(&mut self) {
        self.start_secs = self.source.now_secs();
    }

    /// Sample the clock.
    pub fn frame_time(&self) -> FrameTime {
        FrameTime {
            elapsed_secs: (self.source.now_secs() - self.start_secs).max(0.0),
            wall_secs: self.source.wall_secs(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/clock.rs"]
mod tests;
