//! The GPU-facing seam of the batcher.
//!
//! [`BatchBackend`] gathers everything the batcher needs from the rest of a
//! renderer: the texture-unit binding table, program creation, geometry
//! upload and indexed draws. Methods take `&self` so one backend can be
//! shared (via `Arc`) between several batchers and other renderers;
//! implementations use interior mutability.

use crate::batched::{BatchProgram, DrawMode, GeometryLayout};
use crate::blend::BlendMode;
use crate::error::BatchResult;
use crate::texture::TextureHandle;

/// Backend handle to a created program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Backend handle to a vertex + index buffer pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryId(pub u32);

/// Operations the batcher consumes from a GPU backend.
pub trait BatchBackend: Send + Sync {
    // Capabilities

    /// Number of texture units a fragment stage may sample from.
    fn max_texture_units(&self) -> u32;

    /// Whether one buffer may be re-uploaded several times within a frame
    /// without corrupting draws recorded earlier in that frame.
    fn can_upload_same_buffer(&self) -> bool;

    /// Try to compile a fragment-stage probe shader. Returns `false` if the
    /// driver rejects it.
    fn compile_probe(&self, source: &str) -> bool;

    // Texture binding

    /// Copy the currently bound texture of each unit into `out`. Units past
    /// the end of `out` are ignored.
    fn copy_bound_textures(&self, out: &mut [Option<TextureHandle>]);

    /// Bind `texture` to `unit`.
    fn bind_texture(&self, texture: &TextureHandle, unit: u32);

    // Programs

    /// Create a program from generated source.
    fn create_program(&self, program: &BatchProgram) -> BatchResult<ProgramId>;

    /// Make `program` current for subsequent draws.
    fn bind_program(&self, program: ProgramId);

    // Geometry

    /// Create an empty vertex + index buffer pair with the given layout.
    fn create_geometry(&self, layout: &GeometryLayout) -> GeometryId;

    /// Replace the contents of a geometry's buffers.
    fn upload_geometry(&self, geometry: GeometryId, vertices: &[u8], indices: &[u16]);

    /// Make `geometry` current for subsequent draws.
    fn bind_geometry(&self, geometry: GeometryId);

    /// Release a geometry's buffers.
    fn destroy_geometry(&self, geometry: GeometryId);

    // State and draws

    fn set_blend_mode(&self, blend: BlendMode);

    /// Draw `count` indices of the current geometry starting `byte_offset`
    /// bytes into its index buffer.
    fn draw_elements(
        &self,
        mode: DrawMode,
        count: u32,
        format: wgpu::IndexFormat,
        byte_offset: u64,
    );
}
