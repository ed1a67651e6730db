use crate::foundation::error::{StageError, StageResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Three-component vector used by render-facing records.
///
/// Serialized as a `[x, y, z]` array.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vec3 {
    /// Construct from components.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Drop the z component.
    pub fn xy(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Sampling instant handed to every motion resolver.
///
/// Both values come from one scene clock read, so a tick and a resize that happen in the same
/// frame observe the same time.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct FrameTime {
    /// Seconds since the scene clock was started.
    pub elapsed_secs: f64,
    /// Wall-clock seconds since the Unix epoch (drives clock-synced behaviors).
    pub wall_secs: f64,
}

impl FrameTime {
    /// Frame time with only the elapsed component set.
    pub fn at(elapsed_secs: f64) -> Self {
        Self {
            elapsed_secs,
            wall_secs: 0.0,
        }
    }
}

/// Host drawing surface in CSS-style pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Surface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Device pixel ratio reported by the host.
    pub pixel_ratio: f64,
}

impl Surface {
    /// Create a validated surface with a pixel ratio of 1.
    pub fn new(width: u32, height: u32) -> StageResult<Self> {
        Self::with_pixel_ratio(width, height, 1.0)
    }

    /// Create a validated surface.
    pub fn with_pixel_ratio(width: u32, height: u32, pixel_ratio: f64) -> StageResult<Self> {
        if width == 0 || height == 0 {
            return Err(StageError::validation("surface dimensions must be > 0"));
        }
        if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
            return Err(StageError::validation(
                "surface pixel_ratio must be finite and > 0",
            ));
        }
        Ok(Self {
            width,
            height,
            pixel_ratio,
        })
    }

    /// Surface size as a vector.
    pub fn size(self) -> Vec2 {
        Vec2::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Where stage coordinate `(0, 0)` sits on the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageOrigin {
    /// Surface center.
    #[default]
    Center,
    /// Top-left corner.
    TopLeft,
}

impl StageOrigin {
    /// Surface-space position of the stage origin.
    pub fn resolve(self, surface: Surface) -> Vec2 {
        match self {
            Self::Center => surface.size() * 0.5,
            Self::TopLeft => Vec2::ZERO,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
