//! Immediate-mode 2D canvas backend.
//!
//! Each present rebuilds a draw list of `(transform, rect, opacity)` commands in paint order, the
//! shape a 2D context's `setTransform` + `drawImage` sequence needs.

use std::{collections::BTreeMap, sync::Arc};

use kurbo::{Affine, Rect};

use crate::{
    assets::loader::Resource,
    compose::stage_object::{RenderMode, StageObject},
    foundation::core::Surface,
    foundation::error::{StageError, StageResult},
    render::adapter::{AdapterSettings, AdapterStats, CanvasAdapter, natural_size, place},
};

/// One `drawImage` call.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCommand {
    /// Object id.
    pub id: String,
    /// Image URL.
    pub src: String,
    /// Object-local to device-pixel transform.
    pub transform: Affine,
    /// Destination rectangle in object-local units.
    pub rect: Rect,
    /// Global alpha.
    pub opacity: f64,
}

#[derive(Clone, Debug)]
struct Entry {
    obj: StageObject,
    natural: Option<(u32, u32)>,
    seq: u64,
}

/// 2D canvas backend, registered as `canvas2d`.
#[derive(Debug)]
pub struct Canvas2dAdapter {
    settings: AdapterSettings,
    surface: Option<Surface>,
    entries: BTreeMap<String, Entry>,
    next_seq: u64,
    draw_list: Vec<DrawCommand>,
    presents: u64,
    disposed: bool,
}

impl Canvas2dAdapter {
    /// Registry key.
    pub const KEY: &'static str = "canvas2d";

    /// Unmounted adapter.
    pub fn new(settings: AdapterSettings) -> Self {
        Self {
            settings,
            surface: None,
            entries: BTreeMap::new(),
            next_seq: 0,
            draw_list: Vec::new(),
            presents: 0,
            disposed: false,
        }
    }

    /// Commands produced by the last present, in paint order.
    pub fn draw_list(&self) -> &[DrawCommand] {
        &self.draw_list
    }

    /// Clear color applied at the start of each frame.
    pub fn clear_rgba(&self) -> Option<[u8; 4]> {
        self.settings.clear_rgba
    }

    /// Mounted surface.
    pub fn surface(&self) -> Option<Surface> {
        self.surface
    }
}

impl CanvasAdapter for Canvas2dAdapter {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn render_mode(&self) -> RenderMode {
        RenderMode::Flat
    }

    fn mount(&mut self, surface: Surface) -> StageResult<()> {
        if self.disposed {
            return Err(StageError::render_backend("canvas2d: adapter was disposed"));
        }
        self.surface = Some(surface);
        Ok(())
    }

    fn upsert(&mut self, obj: &StageObject, resource: Option<&Arc<Resource>>) {
        let natural = natural_size(resource);
        if let Some(e) = self.entries.get_mut(&obj.id) {
            e.obj = obj.clone();
            if natural.is_some() {
                e.natural = natural;
            }
            return;
        }
        self.entries.insert(
            obj.id.clone(),
            Entry {
                obj: obj.clone(),
                natural,
                seq: self.next_seq,
            },
        );
        self.next_seq += 1;
    }

    fn remove(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    fn resize(&mut self, surface: Surface) {
        self.surface = Some(surface);
    }

    fn present(&mut self) -> StageResult<()> {
        let surface = self
            .surface
            .ok_or_else(|| StageError::render_backend("canvas2d: present before mount"))?;

        let mut visible: Vec<&Entry> = self
            .entries
            .values()
            .filter(|e| e.obj.visible && e.obj.metadata.opacity > 0.0)
            .collect();
        visible.sort_by(|a, b| {
            a.obj
                .position
                .z
                .total_cmp(&b.obj.position.z)
                .then(a.seq.cmp(&b.seq))
        });

        self.draw_list = visible
            .into_iter()
            .map(|e| {
                let p = place(&e.obj, e.natural, surface);
                DrawCommand {
                    id: e.obj.id.clone(),
                    src: e.obj.metadata.src.clone(),
                    transform: p.transform,
                    rect: p.rect,
                    opacity: e.obj.metadata.opacity,
                }
            })
            .collect();
        self.presents += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        self.entries.clear();
        self.draw_list.clear();
        self.surface = None;
        self.disposed = true;
    }

    fn stats(&self) -> AdapterStats {
        let textures = self
            .entries
            .values()
            .map(|e| e.obj.metadata.src.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        AdapterStats {
            objects: self.entries.len(),
            drawn: self.draw_list.len(),
            textures,
            presents: self.presents,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas2d.rs"]
mod tests;
