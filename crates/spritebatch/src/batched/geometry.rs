//! Interleaved vertex + index geometry and the ring of upload slots.

use static_assertions::const_assert_eq;

use crate::backend::{BatchBackend, GeometryId};

/// 32-bit words per vertex of the stock sprite layout:
/// position (2), uv (2), packed color (1), texture unit (1).
pub const SPRITE_VERTEX_WORDS: usize = 6;

const SPRITE_ATTRIBUTES: &[wgpu::VertexAttribute] = &wgpu::vertex_attr_array![
    // location 0: position (vec2)
    0 => Float32x2,
    // location 1: uv (vec2)
    1 => Float32x2,
    // location 2: tint + alpha, normalized bytes
    2 => Unorm8x4,
    // location 3: texture unit (f32)
    3 => Float32,
];

const_assert_eq!(SPRITE_VERTEX_WORDS * 4, 24);

/// Vertex layout of a batch geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryLayout {
    /// Bytes per vertex.
    pub stride: u64,
    pub attributes: &'static [wgpu::VertexAttribute],
    pub index_format: wgpu::IndexFormat,
}

impl GeometryLayout {
    /// Layout of the stock sprite vertex.
    pub const SPRITE: GeometryLayout = GeometryLayout {
        stride: (SPRITE_VERTEX_WORDS * 4) as u64,
        attributes: SPRITE_ATTRIBUTES,
        index_format: wgpu::IndexFormat::Uint16,
    };

    pub fn vertex_buffer_layout(&self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: self.attributes,
        }
    }
}

/// A backend geometry that receives the packed buffers of one flush.
#[derive(Debug)]
pub struct BatchGeometry {
    id: GeometryId,
    uploads: u64,
}

impl BatchGeometry {
    pub fn new(backend: &dyn BatchBackend, layout: &GeometryLayout) -> Self {
        Self {
            id: backend.create_geometry(layout),
            uploads: 0,
        }
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    /// How many times this geometry has been uploaded to.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn update(&mut self, backend: &dyn BatchBackend, vertices: &[u8], indices: &[u16]) {
        backend.upload_geometry(self.id, vertices, indices);
        self.uploads += 1;
    }
}

/// Geometries cycled through by successive flushes.
///
/// When the backend may re-upload a buffer within a frame, every flush
/// reuses slot 0. Otherwise each flush of a frame takes the next slot,
/// growing the ring when it runs out, so earlier draws of the frame keep
/// reading their own data. [`reset`](Self::reset) rewinds at frame start.
#[derive(Debug)]
pub struct GeometryRing {
    layout: GeometryLayout,
    geometries: Vec<BatchGeometry>,
    cursor: usize,
    can_upload_same_buffer: bool,
}

impl GeometryRing {
    pub fn new(
        backend: &dyn BatchBackend,
        layout: GeometryLayout,
        initial_size: usize,
        can_upload_same_buffer: bool,
    ) -> Self {
        let geometries = (0..initial_size.max(1))
            .map(|_| BatchGeometry::new(backend, &layout))
            .collect();

        Self {
            layout,
            geometries,
            cursor: 0,
            can_upload_same_buffer,
        }
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn geometries(&self) -> &[BatchGeometry] {
        &self.geometries
    }

    pub fn can_upload_same_buffer(&self) -> bool {
        self.can_upload_same_buffer
    }

    /// Bind the shared slot when every flush uploads into it.
    pub fn bind_shared(&self, backend: &dyn BatchBackend) {
        if self.can_upload_same_buffer {
            backend.bind_geometry(self.geometries[0].id());
        }
    }

    /// Upload a flush's packed data into the next slot and bind it.
    pub fn upload(&mut self, backend: &dyn BatchBackend, vertices: &[u8], indices: &[u16]) {
        if self.can_upload_same_buffer {
            self.geometries[0].update(backend, vertices, indices);
            return;
        }

        if self.geometries.len() <= self.cursor {
            tracing::debug!(slots = self.cursor + 1, "growing geometry ring");
            self.geometries
                .push(BatchGeometry::new(backend, &self.layout));
        }

        let geometry = &mut self.geometries[self.cursor];
        geometry.update(backend, vertices, indices);
        backend.bind_geometry(geometry.id());
        self.cursor += 1;
    }

    /// Rewind to slot 0 for a new frame.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn destroy(&mut self, backend: &dyn BatchBackend) {
        for geometry in self.geometries.drain(..) {
            backend.destroy_geometry(geometry.id());
        }
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{BackendCall, MockBatchBackend};

    #[test]
    fn test_sprite_layout_offsets() {
        let layout = GeometryLayout::SPRITE;
        assert_eq!(layout.stride, 24);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16, 20]);
    }

    #[test]
    fn test_ring_grows_when_same_buffer_upload_disallowed() {
        let backend = MockBatchBackend::new();
        let mut ring = GeometryRing::new(&backend, GeometryLayout::SPRITE, 2, false);
        assert_eq!(ring.len(), 2);

        for _ in 0..3 {
            ring.upload(&backend, &[0; 24], &[0, 0, 0]);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(backend.count_geometry_creates(), 3);

        ring.reset();
        ring.upload(&backend, &[0; 24], &[0, 0, 0]);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.geometries()[0].uploads(), 2);
    }

    #[test]
    fn test_shared_slot_reused() {
        let backend = MockBatchBackend::new();
        let mut ring = GeometryRing::new(&backend, GeometryLayout::SPRITE, 2, true);

        for _ in 0..4 {
            ring.upload(&backend, &[0; 24], &[0, 1, 2]);
        }
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.geometries()[0].uploads(), 4);
        assert_eq!(ring.geometries()[1].uploads(), 0);
        assert!(
            !backend
                .calls()
                .iter()
                .any(|call| matches!(call, BackendCall::BindGeometry { .. }))
        );
    }

    #[test]
    fn test_destroy_releases_all_slots() {
        let backend = MockBatchBackend::new();
        let mut ring = GeometryRing::new(&backend, GeometryLayout::SPRITE, 2, false);
        ring.destroy(&backend);
        assert!(ring.is_empty());
        assert_eq!(backend.count_geometry_destroys(), 2);
    }
}
