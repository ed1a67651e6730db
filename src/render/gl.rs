//! GL-style quad batcher.
//!
//! Objects are flattened into textured quads in normalized device coordinates. Consecutive quads
//! sharing a texture are merged into one draw call.

use std::{collections::BTreeMap, sync::Arc};

use kurbo::Point;

use crate::{
    assets::loader::Resource,
    compose::stage_object::{RenderMode, StageObject},
    foundation::core::Surface,
    foundation::error::{StageError, StageResult},
    render::adapter::{AdapterSettings, AdapterStats, CanvasAdapter, natural_size, place},
};

/// Largest viewport edge, in device pixels, the batcher accepts.
pub const MAX_VIEWPORT: f64 = 16_384.0;

/// One vertex of the interleaved buffer.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Vertex {
    /// Clip-space position.
    pub pos: [f32; 2],
    /// Texture coordinate.
    pub uv: [f32; 2],
    /// Premultiplied alpha multiplier.
    pub alpha: f32,
}

/// A run of quads drawn with one texture bind.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct DrawCall {
    /// Texture slot.
    pub texture: usize,
    /// First quad in the batch.
    pub first_quad: usize,
    /// Number of quads.
    pub quads: usize,
}

/// Uploaded texture.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TextureSlot {
    /// Slot index used by draw calls.
    pub slot: usize,
    /// Texture width.
    pub width: u32,
    /// Texture height.
    pub height: u32,
}

#[derive(Clone, Debug)]
struct Entry {
    obj: StageObject,
    natural: Option<(u32, u32)>,
    seq: u64,
}

/// Quad-batching backend, registered as `gl`.
#[derive(Debug)]
pub struct GlAdapter {
    settings: AdapterSettings,
    surface: Option<Surface>,
    entries: BTreeMap<String, Entry>,
    next_seq: u64,
    textures: BTreeMap<String, TextureSlot>,
    texture_refs: BTreeMap<String, usize>,
    free_slots: Vec<usize>,
    next_slot: usize,
    vertices: Vec<Vertex>,
    draw_calls: Vec<DrawCall>,
    presents: u64,
    disposed: bool,
}

impl GlAdapter {
    /// Registry key.
    pub const KEY: &'static str = "gl";

    /// Unmounted adapter.
    pub fn new(settings: AdapterSettings) -> Self {
        Self {
            settings,
            surface: None,
            entries: BTreeMap::new(),
            next_seq: 0,
            textures: BTreeMap::new(),
            texture_refs: BTreeMap::new(),
            free_slots: Vec::new(),
            next_slot: 0,
            vertices: Vec::new(),
            draw_calls: Vec::new(),
            presents: 0,
            disposed: false,
        }
    }

    /// Vertex buffer from the last present, four vertices per quad.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Draw calls from the last present.
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    /// Uploaded texture for `url`.
    pub fn texture(&self, url: &str) -> Option<&TextureSlot> {
        self.textures.get(url)
    }

    /// Clear color as normalized floats.
    pub fn clear_color(&self) -> [f32; 4] {
        let [r, g, b, a] = self.settings.clear_rgba.unwrap_or([0, 0, 0, 0]);
        [r, g, b, a].map(|c| f32::from(c) / 255.0)
    }

    fn upload(&mut self, url: &str, resource: &Resource) {
        if self.textures.contains_key(url) {
            return;
        }
        let slot = self.free_slots.pop().unwrap_or_else(|| {
            self.next_slot += 1;
            self.next_slot - 1
        });
        tracing::trace!(url, slot, "gl texture upload");
        self.textures.insert(
            url.to_owned(),
            TextureSlot {
                slot,
                width: resource.width,
                height: resource.height,
            },
        );
    }
}

impl GlAdapter {
    fn retain_texture(&mut self, url: &str) {
        *self.texture_refs.entry(url.to_owned()).or_insert(0) += 1;
    }

    fn release_texture(&mut self, url: &str) {
        let Some(n) = self.texture_refs.get_mut(url) else {
            return;
        };
        *n -= 1;
        if *n > 0 {
            return;
        }
        self.texture_refs.remove(url);
        if let Some(tex) = self.textures.remove(url) {
            tracing::trace!(url, slot = tex.slot, "gl texture freed");
            self.free_slots.push(tex.slot);
        }
    }

    fn check_viewport(surface: Surface) -> StageResult<()> {
        let device = surface.size() * surface.pixel_ratio;
        if device.x > MAX_VIEWPORT || device.y > MAX_VIEWPORT {
            return Err(StageError::render_backend(format!(
                "gl: viewport {}x{} exceeds {MAX_VIEWPORT}",
                device.x, device.y
            )));
        }
        Ok(())
    }
}

impl CanvasAdapter for GlAdapter {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn render_mode(&self) -> RenderMode {
        RenderMode::Flat
    }

    fn mount(&mut self, surface: Surface) -> StageResult<()> {
        if self.disposed {
            return Err(StageError::render_backend("gl: adapter was disposed"));
        }
        Self::check_viewport(surface)?;
        self.surface = Some(surface);
        Ok(())
    }

    fn upsert(&mut self, obj: &StageObject, resource: Option<&Arc<Resource>>) {
        let previous = self.entries.get(&obj.id).map(|e| e.obj.metadata.src.clone());
        if previous.as_deref() != Some(obj.metadata.src.as_str()) {
            self.retain_texture(&obj.metadata.src);
            if let Some(old) = previous {
                self.release_texture(&old);
            }
        }
        if let Some(r) = resource {
            self.upload(&obj.metadata.src, r);
        }
        let natural = natural_size(resource).or_else(|| {
            self.textures
                .get(&obj.metadata.src)
                .map(|t| (t.width, t.height))
        });
        let seq = match self.entries.get(&obj.id) {
            Some(e) => e.seq,
            None => {
                self.next_seq += 1;
                self.next_seq - 1
            }
        };
        self.entries.insert(
            obj.id.clone(),
            Entry {
                obj: obj.clone(),
                natural,
                seq,
            },
        );
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some(e) => {
                self.release_texture(&e.obj.metadata.src);
                true
            }
            None => false,
        }
    }

    fn resize(&mut self, surface: Surface) {
        // Oversized viewports keep the previous surface.
        if let Err(e) = Self::check_viewport(surface) {
            tracing::warn!(error = %e, "gl resize ignored");
            return;
        }
        self.surface = Some(surface);
    }

    fn present(&mut self) -> StageResult<()> {
        let surface = self
            .surface
            .ok_or_else(|| StageError::render_backend("gl: present before mount"))?;
        let device = surface.size() * surface.pixel_ratio;

        let mut visible: Vec<&Entry> = self
            .entries
            .values()
            .filter(|e| e.obj.visible && e.obj.metadata.opacity > 0.0)
            .filter(|e| self.textures.contains_key(&e.obj.metadata.src))
            .collect();
        visible.sort_by(|a, b| {
            a.obj
                .position
                .z
                .total_cmp(&b.obj.position.z)
                .then(a.seq.cmp(&b.seq))
        });

        let mut vertices = Vec::with_capacity(visible.len() * 4);
        let mut draw_calls: Vec<DrawCall> = Vec::new();
        for e in visible {
            let Some(tex) = self.textures.get(&e.obj.metadata.src) else {
                continue;
            };
            let p = place(&e.obj, e.natural, surface);
            let r = p.rect;
            let corners = [
                (Point::new(r.x0, r.y0), [0.0, 0.0]),
                (Point::new(r.x1, r.y0), [1.0, 0.0]),
                (Point::new(r.x1, r.y1), [1.0, 1.0]),
                (Point::new(r.x0, r.y1), [0.0, 1.0]),
            ];
            let quad = vertices.len() / 4;
            let alpha = e.obj.metadata.opacity as f32;
            for (pt, uv) in corners {
                let d = p.transform * pt;
                vertices.push(Vertex {
                    pos: [
                        (d.x / device.x * 2.0 - 1.0) as f32,
                        (1.0 - d.y / device.y * 2.0) as f32,
                    ],
                    uv,
                    alpha,
                });
            }

            match draw_calls.last_mut() {
                Some(call) if call.texture == tex.slot => call.quads += 1,
                _ => draw_calls.push(DrawCall {
                    texture: tex.slot,
                    first_quad: quad,
                    quads: 1,
                }),
            }
        }

        self.vertices = vertices;
        self.draw_calls = draw_calls;
        self.presents += 1;
        Ok(())
    }

    fn dispose(&mut self) {
        self.entries.clear();
        self.textures.clear();
        self.texture_refs.clear();
        self.free_slots.clear();
        self.vertices.clear();
        self.draw_calls.clear();
        self.surface = None;
        self.disposed = true;
    }

    fn stats(&self) -> AdapterStats {
        AdapterStats {
            objects: self.entries.len(),
            drawn: self.vertices.len() / 4,
            textures: self.textures.len(),
            presents: self.presents,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/gl.rs"]
mod tests;
