use crate::{
    animation::MotionResolver,
    foundation::core::{FrameTime, Vec2},
    foundation::math::normalize360,
    scene::normalize::NormalizedLayer,
};

/// Which source produced a layer's rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationSource {
    /// Clock-synced hand angle.
    Clock,
    /// Spin behavior.
    Spin,
    /// The layer's authored rotation.
    Manual,
}

/// Which source produced a layer's position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSource {
    /// Orbit behavior.
    Orbit,
    /// The layer's authored position.
    Base,
}

/// Pick the rotation: clock beats spin beats manual.
pub fn select_angle(
    clock_deg: Option<f64>,
    spin_deg: Option<f64>,
    manual_deg: f64,
) -> (f64, RotationSource) {
    match (clock_deg, spin_deg) {
        (Some(c), _) => (c, RotationSource::Clock),
        (None, Some(s)) => (s, RotationSource::Spin),
        (None, None) => (manual_deg, RotationSource::Manual),
    }
}

/// A layer's final transform at one instant.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ComposedTransform {
    /// Stage-space position.
    pub position: Vec2,
    /// Rotation in degrees.
    pub angle_deg: f64,
    /// Winner of the rotation precedence.
    pub rotation_source: RotationSource,
    /// Winner of the position precedence.
    pub position_source: PositionSource,
    /// Scale after effects.
    pub scale: Vec2,
    /// Opacity after effects, in `[0, 1]`.
    pub opacity: f64,
}

/// Merge a layer's base transform with its active behaviors at `t`.
///
/// Position and rotation are settled first; effects adjust opacity and scale last.
pub fn compose(layer: &NormalizedLayer, t: FrameTime) -> ComposedTransform {
    let b = &layer.behaviors;

    let clock = b.clock.as_ref().and_then(|c| c.resolve(t));
    let spin = b.spin.as_ref().and_then(|s| s.resolve(t));
    let manual = normalize360(layer.rotation_rad.to_degrees());
    let (angle_deg, rotation_source) = select_angle(clock, spin, manual);

    let (position, position_source) = match b
        .orbit
        .as_ref()
        .and_then(|o| o.position(layer.position, t))
    {
        Some(p) => (p, PositionSource::Orbit),
        None => (layer.position, PositionSource::Base),
    };

    let (opacity, scale) = match b.effects.as_ref().and_then(|e| e.resolve(t)) {
        Some(adj) => adj.apply(layer.opacity, layer.scale),
        None => (layer.opacity, layer.scale),
    };

    ComposedTransform {
        position,
        angle_deg,
        rotation_source,
        position_source,
        scale,
        opacity,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/transform.rs"]
mod tests;
