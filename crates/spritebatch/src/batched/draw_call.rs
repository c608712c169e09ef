//! Planned GPU draw operations.

use crate::blend::BlendMode;

/// Primitive assembly for a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

impl DrawMode {
    pub fn to_topology(self) -> wgpu::PrimitiveTopology {
        match self {
            DrawMode::Points => wgpu::PrimitiveTopology::PointList,
            DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
            DrawMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
            DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }

    /// Strip topologies need an index format for primitive restart.
    pub fn strip_index_format(self) -> Option<wgpu::IndexFormat> {
        match self {
            DrawMode::LineStrip | DrawMode::TriangleStrip => Some(wgpu::IndexFormat::Uint16),
            _ => None,
        }
    }
}

/// One GPU draw: a contiguous index range drawn with one blend mode and the
/// texture bindings of one texture array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchDrawCall {
    /// Index of the texture array (within the last flush) providing bindings.
    pub tex_array: usize,
    pub blend: BlendMode,
    pub mode: DrawMode,
    /// First index in the shared index buffer.
    pub start: u32,
    /// Number of indices.
    pub size: u32,
}

impl BatchDrawCall {
    /// Byte offset of `start` in a `u16` index buffer.
    pub fn byte_offset(&self) -> u64 {
        self.start as u64 * std::mem::size_of::<u16>() as u64
    }

    pub fn index_range(&self) -> std::ops::Range<u32> {
        self.start..self.start + self.size
    }
}
