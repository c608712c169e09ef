//! Items consumed by the batcher and the per-frame snapshot it keeps of them.

use std::ops::Range;

use crate::blend::BlendMode;
use crate::texture::TextureHandle;

/// A renderable item supplied by the scene graph.
///
/// Vertex positions and UVs are flat `[x0, y0, x1, y1, ...]` arrays of equal
/// length; `indices` address vertices of this item starting at zero. The
/// batcher copies what it needs during [`render`](super::BatchRenderer::render),
/// so the item only has to stay alive for that call.
pub trait Batchable {
    /// Flat world-space vertex positions.
    fn vertex_data(&self) -> &[f32];

    /// Flat texture coordinates, one pair per vertex.
    fn uvs(&self) -> &[f32];

    /// Triangle indices into this item's vertices.
    fn indices(&self) -> &[u16];

    /// Backing texture.
    fn texture(&self) -> &TextureHandle;

    fn blend_mode(&self) -> BlendMode {
        BlendMode::Normal
    }

    /// Accumulated alpha, nominally in `0.0..=1.0`.
    fn world_alpha(&self) -> f32 {
        1.0
    }

    /// Tint as `0xRRGGBB`.
    fn tint(&self) -> u32 {
        0xff_ffff
    }
}

/// An axis-aligned textured quad, the most common batch item.
#[derive(Debug, Clone)]
pub struct Quad {
    pub texture: TextureHandle,
    pub vertex_data: [f32; 8],
    pub uvs: [f32; 8],
    pub blend_mode: BlendMode,
    pub alpha: f32,
    pub tint: u32,
}

impl Quad {
    /// Two triangles over the four corners, clockwise from top-left.
    pub const INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

    /// Quad covering `(x, y)..(x + width, y + height)` with the full texture.
    pub fn new(texture: TextureHandle, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            texture,
            vertex_data: [x, y, x + width, y, x + width, y + height, x, y + height],
            uvs: [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            blend_mode: BlendMode::Normal,
            alpha: 1.0,
            tint: 0xff_ffff,
        }
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_tint(mut self, tint: u32) -> Self {
        self.tint = tint;
        self
    }
}

impl Batchable for Quad {
    fn vertex_data(&self) -> &[f32] {
        &self.vertex_data
    }

    fn uvs(&self) -> &[f32] {
        &self.uvs
    }

    fn indices(&self) -> &[u16] {
        &Self::INDICES
    }

    fn texture(&self) -> &TextureHandle {
        &self.texture
    }

    fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    fn world_alpha(&self) -> f32 {
        self.alpha
    }

    fn tint(&self) -> u32 {
        self.tint
    }
}

/// Borrowed view of one buffered item, handed to plugin packers.
#[derive(Debug, Clone, Copy)]
pub struct BatchElement<'a> {
    pub texture: &'a TextureHandle,
    pub positions: &'a [f32],
    pub uvs: &'a [f32],
    pub indices: &'a [u16],
    pub blend_mode: BlendMode,
    pub alpha: f32,
    pub tint: u32,
}

impl BatchElement<'_> {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 2
    }
}

/// Snapshot of an item taken by `render`.
#[derive(Debug, Clone)]
pub(crate) struct BufferedElement {
    pub texture: TextureHandle,
    pub blend_mode: BlendMode,
    pub alpha: f32,
    pub tint: u32,
    /// Range into the staged position and UV floats.
    pub floats: Range<usize>,
    /// Range into the staged indices.
    pub indices: Range<usize>,
}

impl BufferedElement {
    pub fn vertex_count(&self) -> usize {
        self.floats.len() / 2
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Flat storage behind every [`BufferedElement`] of the current batch.
///
/// Cleared, never shrunk, after each flush.
#[derive(Debug, Default)]
pub(crate) struct Staging {
    pub elements: Vec<BufferedElement>,
    positions: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u16>,
}

impl Staging {
    pub fn push(&mut self, item: &(impl Batchable + ?Sized)) {
        let float_start = self.positions.len();
        self.positions.extend_from_slice(item.vertex_data());
        self.uvs.extend_from_slice(item.uvs());
        let index_start = self.indices.len();
        self.indices.extend_from_slice(item.indices());

        self.elements.push(BufferedElement {
            texture: item.texture().clone(),
            blend_mode: item.blend_mode(),
            alpha: item.world_alpha(),
            tint: item.tint(),
            floats: float_start..self.positions.len(),
            indices: index_start..self.indices.len(),
        });
    }

    pub fn element<'a>(&'a self, buffered: &'a BufferedElement) -> BatchElement<'a> {
        BatchElement {
            texture: &buffered.texture,
            positions: &self.positions[buffered.floats.clone()],
            uvs: &self.uvs[buffered.floats.clone()],
            indices: &self.indices[buffered.indices.clone()],
            blend_mode: buffered.blend_mode,
            alpha: buffered.alpha,
            tint: buffered.tint,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.positions.clear();
        self.uvs.clear();
        self.indices.clear();
    }
}

/// Counters accumulated since the last `on_prerender`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Flushes that issued at least one draw call.
    pub flushes: u32,
    /// GPU draw calls issued.
    pub draw_calls: u32,
    /// Texture arrays built.
    pub texture_arrays: u32,
    /// Vertices packed.
    pub vertices: u32,
    /// Indices packed.
    pub indices: u32,
    /// Texture bind calls issued.
    pub texture_binds: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Texture;

    #[test]
    fn test_quad_geometry() {
        let quad = Quad::new(Texture::new(2, 2), 10.0, 20.0, 5.0, 6.0);
        assert_eq!(quad.vertex_data()[4..6], [15.0, 26.0]);
        assert_eq!(quad.indices().len(), 6);
        assert_eq!(quad.uvs().len(), quad.vertex_data().len());
    }

    #[test]
    fn test_staging_keeps_items_apart() {
        let texture = Texture::new(2, 2);
        let mut staging = Staging::default();
        staging.push(&Quad::new(texture.clone(), 0.0, 0.0, 1.0, 1.0));
        staging.push(&Quad::new(texture, 5.0, 5.0, 1.0, 1.0).with_alpha(0.25));

        assert_eq!(staging.len(), 2);
        let second = staging.element(&staging.elements[1]);
        assert_eq!(second.positions[0], 5.0);
        assert_eq!(second.vertex_count(), 4);
        assert_eq!(second.alpha, 0.25);
        assert_eq!(staging.elements[1].floats, 8..16);
        assert_eq!(staging.elements[1].indices, 6..12);

        staging.clear();
        assert_eq!(staging.len(), 0);
    }
}
