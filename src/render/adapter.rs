use std::sync::Arc;

use kurbo::{Affine, Rect, Vec2};

use crate::{
    assets::loader::Resource,
    compose::stage_object::{RenderMode, StageObject},
    foundation::core::Surface,
    foundation::error::StageResult,
    scene::model::Fit,
};

/// Options shared by every backend.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct AdapterSettings {
    /// Color the surface is cleared to before drawing; `None` leaves it transparent.
    pub clear_rgba: Option<[u8; 4]>,
}

/// Counters reported by a backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct AdapterStats {
    /// Live objects.
    pub objects: usize,
    /// Objects drawn by the last present.
    pub drawn: usize,
    /// Distinct textures held.
    pub textures: usize,
    /// Completed presents.
    pub presents: u64,
}

/// A rendering backend that consumes [`StageObject`]s.
///
/// Adapters own all drawing-API state; nothing upstream touches it. Objects are keyed by id, so
/// `upsert` both creates and updates.
pub trait CanvasAdapter: Send {
    /// Registry key this adapter was created under.
    fn key(&self) -> &'static str;

    /// How the adapter interprets rotation.
    fn render_mode(&self) -> RenderMode;

    /// Attach to the host surface. Called once before anything else.
    fn mount(&mut self, surface: Surface) -> StageResult<()>;

    /// Create or update an object; `resource` is the decoded image for `metadata.src`.
    fn upsert(&mut self, obj: &StageObject, resource: Option<&Arc<Resource>>);

    /// Drop an object; returns whether it existed.
    fn remove(&mut self, id: &str) -> bool;

    /// Surface size or pixel ratio changed.
    fn resize(&mut self, surface: Surface);

    /// Flush pending changes into a frame.
    fn present(&mut self) -> StageResult<()>;

    /// Free every backend resource. Idempotent.
    fn dispose(&mut self);

    /// Current counters.
    fn stats(&self) -> AdapterStats;
}

/// Where an object's image lands on the surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Object-local to device-pixel transform.
    pub transform: Affine,
    /// Image rectangle in object-local units.
    pub rect: Rect,
}

/// Lay out an object's image inside its box and map it to device pixels.
///
/// The box is `metadata.w x metadata.h`, falling back to the image's natural size. `anchor` is a
/// fraction of the box that sits at the object's position; `fit` and `align` place the image
/// inside the box.
pub fn place(obj: &StageObject, natural: Option<(u32, u32)>, surface: Surface) -> Placement {
    let natural = natural.map(|(w, h)| Vec2::new(f64::from(w), f64::from(h)));
    let meta = &obj.metadata;
    let box_size = Vec2::new(
        meta.w.or(natural.map(|n| n.x)).unwrap_or(0.0),
        meta.h.or(natural.map(|n| n.y)).unwrap_or(0.0),
    );
    let image = natural.unwrap_or(box_size);

    let fitted = fit_size(meta.fit, image, box_size);
    let (ax, ay) = meta.align.factors();
    let box_origin = Vec2::new(-meta.anchor[0] * box_size.x, -meta.anchor[1] * box_size.y);
    let origin = box_origin
        + Vec2::new(
            (box_size.x - fitted.x) * ax,
            (box_size.y - fitted.y) * ay,
        );
    let rect = Rect::from_origin_size(origin.to_point(), fitted.to_size());

    let stage = meta.stage_origin.resolve(surface);
    let transform = Affine::scale(surface.pixel_ratio)
        * Affine::translate(stage + obj.position.xy())
        * Affine::rotate(obj.rotation.z())
        * Affine::scale_non_uniform(obj.scale.x, obj.scale.y);

    Placement { transform, rect }
}

fn fit_size(fit: Fit, image: Vec2, bx: Vec2) -> Vec2 {
    if image.x <= 0.0 || image.y <= 0.0 {
        return bx;
    }
    match fit {
        Fit::Fill => bx,
        Fit::None => image,
        Fit::Contain => image * (bx.x / image.x).min(bx.y / image.y),
        Fit::Cover => image * (bx.x / image.x).max(bx.y / image.y),
    }
}

/// Natural size of an optional resource.
pub(crate) fn natural_size(resource: Option<&Arc<Resource>>) -> Option<(u32, u32)> {
    resource.map(|r| (r.width, r.height))
}

#[cfg(test)]
#[path = "../../tests/unit/render/adapter.rs"]
mod tests;
