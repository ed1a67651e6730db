use crate::{
    compose::transform::ComposedTransform,
    foundation::core::{StageOrigin, Vec3},
    scene::model::{Align, Fit},
    scene::normalize::NormalizedLayer,
};

/// How backends interpret rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// 2D: only the z rotation is meaningful.
    #[default]
    Flat,
    /// 3D scene graph: full Euler rotation.
    Spatial,
}

/// Rotation in radians; a bare number in flat mode, `[rx, ry, rz]` in spatial mode.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Rotation {
    /// Rotation about the view axis.
    Z(f64),
    /// Euler angles.
    Euler(Vec3),
}

impl Rotation {
    fn for_mode(mode: RenderMode, rz: f64) -> Self {
        match mode {
            RenderMode::Flat => Self::Z(rz),
            RenderMode::Spatial => Self::Euler(Vec3::new(0.0, 0.0, rz)),
        }
    }

    /// The view-axis component.
    pub fn z(self) -> f64 {
        match self {
            Self::Z(z) => z,
            Self::Euler(v) => v.z,
        }
    }
}

/// Backend-interpreted properties of a stage object.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageMetadata {
    /// Resolved resource URL.
    pub src: String,
    /// Explicit box width; backends fall back to the image size.
    pub w: Option<f64>,
    /// Explicit box height.
    pub h: Option<f64>,
    /// Opacity in `[0, 1]`.
    pub opacity: f64,
    /// Anchor point `[x, y]` relative to the box.
    pub anchor: [f64; 2],
    /// Fit mode.
    pub fit: Fit,
    /// Alignment.
    pub align: Align,
    /// Where stage `(0, 0)` sits on the surface.
    pub stage_origin: StageOrigin,
}

/// Render-facing record pushed to canvas adapters every frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StageObject {
    /// Layer id.
    pub id: String,
    /// `[x, y, order]`.
    pub position: Vec3,
    /// Rotation in radians.
    pub rotation: Rotation,
    /// `[sx, sy, 1]`.
    pub scale: Vec3,
    /// Visibility flag.
    pub visible: bool,
    /// Backend-interpreted properties.
    pub metadata: StageMetadata,
}

/// Build the stage object for a layer whose image resolved to `src`.
pub fn to_stage_object(
    layer: &NormalizedLayer,
    composed: &ComposedTransform,
    src: String,
    origin: StageOrigin,
    mode: RenderMode,
) -> StageObject {
    let mut obj = StageObject {
        id: layer.id.clone(),
        position: Vec3::new(0.0, 0.0, layer.order as f64),
        rotation: Rotation::Z(0.0),
        scale: Vec3::new(1.0, 1.0, 1.0),
        visible: layer.visible,
        metadata: StageMetadata {
            src,
            w: layer.width,
            h: layer.height,
            opacity: layer.opacity,
            anchor: [layer.anchor.x, layer.anchor.y],
            fit: layer.fit,
            align: layer.align,
            stage_origin: origin,
        },
    };
    apply_composed(&mut obj, composed, mode);
    obj
}

/// Overwrite the per-frame fields of `obj`; `position.z` and the static metadata are kept.
pub fn apply_composed(obj: &mut StageObject, composed: &ComposedTransform, mode: RenderMode) {
    obj.position.x = composed.position.x;
    obj.position.y = composed.position.y;
    obj.rotation = Rotation::for_mode(mode, composed.angle_deg.to_radians());
    obj.scale = Vec3::new(composed.scale.x, composed.scale.y, 1.0);
    obj.metadata.opacity = composed.opacity;
}

#[cfg(test)]
#[path = "../../tests/unit/compose/stage_object.rs"]
mod tests;
