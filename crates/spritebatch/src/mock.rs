//! Mock implementation of [`BatchBackend`] for testing.
//!
//! The mock records every backend call without touching a GPU, keeps a
//! texture-unit table so bound-texture affinity can be observed, and keeps
//! copies of the most recent geometry upload.

use parking_lot::Mutex;

use crate::backend::{BatchBackend, GeometryId, ProgramId};
use crate::batched::{BatchProgram, DrawMode, GeometryLayout};
use crate::blend::BlendMode;
use crate::error::{BatchError, BatchResult};
use crate::texture::{TextureHandle, TextureId};

/// Records a backend call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    BindTexture {
        texture: TextureId,
        unit: u32,
    },
    CompileProbe {
        arms: u32,
    },
    CreateProgram {
        max_textures: u32,
    },
    BindProgram {
        program: ProgramId,
    },
    CreateGeometry {
        geometry: GeometryId,
    },
    UploadGeometry {
        geometry: GeometryId,
        vertex_bytes: usize,
        index_count: usize,
    },
    BindGeometry {
        geometry: GeometryId,
    },
    DestroyGeometry {
        geometry: GeometryId,
    },
    SetBlendMode {
        blend: BlendMode,
    },
    DrawElements {
        mode: DrawMode,
        count: u32,
        byte_offset: u64,
    },
}

#[derive(Debug, Default)]
struct MockState {
    bound: Vec<Option<TextureHandle>>,
    last_vertices: Vec<u8>,
    last_indices: Vec<u16>,
    next_program: u32,
    next_geometry: u32,
}

/// Backend that records calls instead of issuing GPU work.
///
/// # Example
///
/// ```rust
/// use spritebatch::mock::MockBatchBackend;
/// use spritebatch::BatchBackend;
///
/// let backend = MockBatchBackend::new().with_max_texture_units(8);
/// assert_eq!(backend.max_texture_units(), 8);
/// assert!(backend.calls().is_empty());
/// ```
#[derive(Debug)]
pub struct MockBatchBackend {
    calls: Mutex<Vec<BackendCall>>,
    state: Mutex<MockState>,
    max_texture_units: u32,
    can_upload_same_buffer: bool,
    /// Largest `if`/`else` arm count the pretend compiler accepts.
    branch_limit: Option<u32>,
    reject_programs: bool,
}

impl Default for MockBatchBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBatchBackend {
    /// A backend with 16 texture units that allows same-buffer uploads and
    /// compiles any probe.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            state: Mutex::new(MockState::default()),
            max_texture_units: 16,
            can_upload_same_buffer: true,
            branch_limit: None,
            reject_programs: false,
        }
    }

    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = units;
        self
    }

    pub fn with_can_upload_same_buffer(mut self, allowed: bool) -> Self {
        self.can_upload_same_buffer = allowed;
        self
    }

    /// Reject probe shaders with more than `arms` branches.
    pub fn with_branch_limit(mut self, arms: u32) -> Self {
        self.branch_limit = Some(arms);
        self
    }

    /// Fail every `create_program` call.
    pub fn with_program_failure(mut self) -> Self {
        self.reject_programs = true;
        self
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }

    /// Get a copy of all recorded calls.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Forget recorded calls. The unit table and last upload are kept.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    pub fn count_geometry_creates(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::CreateGeometry { .. }))
    }

    pub fn count_geometry_destroys(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::DestroyGeometry { .. }))
    }

    pub fn count_geometry_uploads(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::UploadGeometry { .. }))
    }

    pub fn count_probes(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::CompileProbe { .. }))
    }

    pub fn count_programs(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::CreateProgram { .. }))
    }

    pub fn count_draws(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::DrawElements { .. }))
    }

    pub fn count_texture_binds(&self) -> usize {
        self.count(|call| matches!(call, BackendCall::BindTexture { .. }))
    }

    /// `(count, byte_offset)` of every recorded draw, in order.
    pub fn draws(&self) -> Vec<(u32, u64)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                BackendCall::DrawElements {
                    count, byte_offset, ..
                } => Some((*count, *byte_offset)),
                _ => None,
            })
            .collect()
    }

    /// Vertex bytes of the most recent upload.
    pub fn last_vertices(&self) -> Vec<u8> {
        self.state.lock().last_vertices.clone()
    }

    /// Indices of the most recent upload.
    pub fn last_indices(&self) -> Vec<u16> {
        self.state.lock().last_indices.clone()
    }

    /// Texture currently bound to `unit`.
    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.state
            .lock()
            .bound
            .get(unit as usize)
            .and_then(|slot| slot.as_ref().map(|texture| texture.id()))
    }
}

impl BatchBackend for MockBatchBackend {
    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn can_upload_same_buffer(&self) -> bool {
        self.can_upload_same_buffer
    }

    fn compile_probe(&self, source: &str) -> bool {
        let arms = source.matches("{}").count() as u32;
        self.record(BackendCall::CompileProbe { arms });
        self.branch_limit.is_none_or(|limit| arms <= limit)
    }

    fn copy_bound_textures(&self, out: &mut [Option<TextureHandle>]) {
        let state = self.state.lock();
        for (unit, slot) in out.iter_mut().enumerate() {
            *slot = state.bound.get(unit).cloned().flatten();
        }
    }

    fn bind_texture(&self, texture: &TextureHandle, unit: u32) {
        self.record(BackendCall::BindTexture {
            texture: texture.id(),
            unit,
        });

        let mut state = self.state.lock();
        let unit = unit as usize;
        if state.bound.len() <= unit {
            state.bound.resize(unit + 1, None);
        }
        state.bound[unit] = Some(texture.clone());
    }

    fn create_program(&self, program: &BatchProgram) -> BatchResult<ProgramId> {
        self.record(BackendCall::CreateProgram {
            max_textures: program.max_textures,
        });
        if self.reject_programs {
            return Err(BatchError::ShaderCompilation {
                message: "mock backend rejects programs".to_string(),
            });
        }

        let mut state = self.state.lock();
        let id = ProgramId(state.next_program);
        state.next_program += 1;
        Ok(id)
    }

    fn bind_program(&self, program: ProgramId) {
        self.record(BackendCall::BindProgram { program });
    }

    fn create_geometry(&self, _layout: &GeometryLayout) -> GeometryId {
        let geometry = {
            let mut state = self.state.lock();
            let id = GeometryId(state.next_geometry);
            state.next_geometry += 1;
            id
        };
        self.record(BackendCall::CreateGeometry { geometry });
        geometry
    }

    fn upload_geometry(&self, geometry: GeometryId, vertices: &[u8], indices: &[u16]) {
        self.record(BackendCall::UploadGeometry {
            geometry,
            vertex_bytes: vertices.len(),
            index_count: indices.len(),
        });

        let mut state = self.state.lock();
        state.last_vertices = vertices.to_vec();
        state.last_indices = indices.to_vec();
    }

    fn bind_geometry(&self, geometry: GeometryId) {
        self.record(BackendCall::BindGeometry { geometry });
    }

    fn destroy_geometry(&self, geometry: GeometryId) {
        self.record(BackendCall::DestroyGeometry { geometry });
    }

    fn set_blend_mode(&self, blend: BlendMode) {
        self.record(BackendCall::SetBlendMode { blend });
    }

    fn draw_elements(
        &self,
        mode: DrawMode,
        count: u32,
        _format: wgpu::IndexFormat,
        byte_offset: u64,
    ) {
        self.record(BackendCall::DrawElements {
            mode,
            count,
            byte_offset,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Texture;

    #[test]
    fn test_bound_table_round_trip() {
        let backend = MockBatchBackend::new();
        let texture = Texture::new(1, 1);
        backend.bind_texture(&texture, 3);

        let mut snapshot = vec![None; 4];
        backend.copy_bound_textures(&mut snapshot);
        assert!(snapshot[..3].iter().all(Option::is_none));
        assert_eq!(snapshot[3].as_ref().map(|t| t.id()), Some(texture.id()));
        assert_eq!(backend.bound_texture(3), Some(texture.id()));
    }

    #[test]
    fn test_probe_counts_arms() {
        let backend = MockBatchBackend::new().with_branch_limit(2);
        assert!(backend.compile_probe("{}\nelse {}"));
        assert!(!backend.compile_probe("{} {} {}"));
        assert_eq!(backend.count_probes(), 2);
    }
}
