//! Retained 3D scene-graph backend.
//!
//! Every stage object becomes a textured plane node. Stage space is y-down; the scene graph is
//! y-up, so `y` and the z rotation are mirrored when nodes are written. The camera is an
//! orthographic projection matching the surface, so a flat scene looks identical to `canvas2d`.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    assets::loader::Resource,
    compose::stage_object::{RenderMode, Rotation, StageObject},
    foundation::core::{Surface, Vec3},
    foundation::error::{StageError, StageResult},
    render::adapter::{AdapterSettings, AdapterStats, CanvasAdapter},
};

/// Distance between adjacent paint orders along the depth axis.
pub const DEPTH_STEP: f64 = 0.01;

/// Orthographic camera bounds in world units.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct OrthoCamera {
    /// Left plane.
    pub left: f64,
    /// Right plane.
    pub right: f64,
    /// Top plane.
    pub top: f64,
    /// Bottom plane.
    pub bottom: f64,
}

impl OrthoCamera {
    fn for_surface(surface: Surface) -> Self {
        let half = surface.size() * 0.5;
        Self {
            left: -half.x,
            right: half.x,
            top: half.y,
            bottom: -half.y,
        }
    }
}

/// A textured plane in the scene graph.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct PlaneNode {
    /// Object id.
    pub id: String,
    /// Texture URL.
    pub texture: String,
    /// World position (y-up, camera-centered).
    pub position: Vec3,
    /// Euler rotation in radians.
    pub rotation: Vec3,
    /// Node scale.
    pub scale: Vec3,
    /// Plane size before scaling.
    pub size: [f64; 2],
    /// Material opacity.
    pub opacity: f64,
    /// Node visibility.
    pub visible: bool,
}

/// 3D scene-graph backend, registered as `scene3d`.
#[derive(Debug)]
pub struct Scene3dAdapter {
    settings: AdapterSettings,
    surface: Option<Surface>,
    camera: Option<OrthoCamera>,
    nodes: BTreeMap<String, (u64, PlaneNode)>,
    next_seq: u64,
    render_list: Vec<String>,
    textures: BTreeMap<String, usize>,
    presents: u64,
    disposed: bool,
}

impl Scene3dAdapter {
    /// Registry key.
    pub const KEY: &'static str = "scene3d";

    /// Unmounted adapter.
    pub fn new(settings: AdapterSettings) -> Self {
        Self {
            settings,
            surface: None,
            camera: None,
            nodes: BTreeMap::new(),
            next_seq: 0,
            render_list: Vec::new(),
            textures: BTreeMap::new(),
            presents: 0,
            disposed: false,
        }
    }

    /// Node for `id`.
    pub fn node(&self, id: &str) -> Option<&PlaneNode> {
        self.nodes.get(id).map(|(_, n)| n)
    }

    /// Node ids drawn by the last present, back to front.
    pub fn render_list(&self) -> &[String] {
        &self.render_list
    }

    /// Current camera.
    pub fn camera(&self) -> Option<OrthoCamera> {
        self.camera
    }

    /// Scene background.
    pub fn background(&self) -> Option<[u8; 4]> {
        self.settings.clear_rgba
    }

    fn to_world(&self, obj: &StageObject) -> (Vec3, Vec3) {
        let stage = match self.surface {
            Some(s) => obj.metadata.stage_origin.resolve(s) - s.size() * 0.5,
            None => kurbo::Vec2::ZERO,
        };
        let rotation = match obj.rotation {
            Rotation::Z(z) => Vec3::new(0.0, 0.0, -z),
            Rotation::Euler(r) => Vec3::new(r.x, r.y, -r.z),
        };
        let position = Vec3::new(
            stage.x + obj.position.x,
            -(stage.y + obj.position.y),
            obj.position.z * DEPTH_STEP,
        );
        (position, rotation)
    }

    fn retain_texture(&mut self, url: &str) {
        *self.textures.entry(url.to_owned()).or_insert(0) += 1;
    }

    fn drop_texture(&mut self, url: &str) {
        if let Some(n) = self.textures.get_mut(url) {
            *n -= 1;
            if *n == 0 {
                self.textures.remove(url);
            }
        }
    }
}

impl CanvasAdapter for Scene3dAdapter {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn render_mode(&self) -> RenderMode {
        RenderMode::Spatial
    }

    fn mount(&mut self, surface: Surface) -> StageResult<()> {
        if self.disposed {
            return Err(StageError::render_backend("scene3d: adapter was disposed"));
        }
        self.surface = Some(surface);
        self.camera = Some(OrthoCamera::for_surface(surface));
        Ok(())
    }

    fn upsert(&mut self, obj: &StageObject, resource: Option<&Arc<Resource>>) {
        let (position, rotation) = self.to_world(obj);
        let previous = self.nodes.get(&obj.id).map(|(seq, n)| (*seq, n.clone()));
        let size = match (&previous, resource) {
            (_, Some(r)) => [f64::from(r.width), f64::from(r.height)],
            (Some((_, n)), None) => n.size,
            (None, None) => [0.0, 0.0],
        };
        let size = [obj.metadata.w.unwrap_or(size[0]), obj.metadata.h.unwrap_or(size[1])];

        let node = PlaneNode {
            id: obj.id.clone(),
            texture: obj.metadata.src.clone(),
            position,
            rotation,
            scale: obj.scale,
            size,
            opacity: obj.metadata.opacity,
            visible: obj.visible,
        };

        let seq = match previous {
            Some((seq, old)) => {
                if old.texture != node.texture {
                    self.drop_texture(&old.texture);
                    self.retain_texture(&node.texture);
                }
                seq
            }
            None => {
                self.retain_texture(&node.texture);
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        self.nodes.insert(obj.id.clone(), (seq, node));
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.nodes.remove(id) {
            Some((_, node)) => {
                self.drop_texture(&node.texture);
                true
            }
            None => false,
        }
    }

    fn resize(&mut self, surface: Surface) {
        self.surface = Some(surface);
        self.camera = Some(OrthoCamera::for_surface(surface));
    }

    fn present(&mut self) -> StageResult<()> {
        if self.camera.is_none() {
            return Err(StageError::render_backend("scene3d: present before mount"));
        }
        let mut visible: Vec<&(u64, PlaneNode)> = self
            .nodes
            .values()
            .filter(|(_, n)| n.visible && n.opacity > 0.0)
            .collect();
        visible.sort_by(|(sa, a), (sb, b)| {
            a.position.z.total_cmp(&b.position.z).then(sa.cmp(sb))
        });
        self.render_list = visible.into_iter().map(|(_, n)| n.id.clone()).collect();
        self.presents += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        self.nodes.clear();
        self.textures.clear();
        self.render_list.clear();
        self.camera = None;
        self.surface = None;
        self.disposed = true;
    }

    fn stats(&self) -> AdapterStats {
        AdapterStats {
            objects: self.nodes.len(),
            drawn: self.render_list.len(),
            textures: self.textures.len(),
            presents: self.presents,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene3d.rs"]
mod tests;
