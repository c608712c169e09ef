//! Configuration for batch renderers.

use crate::error::{BatchError, BatchResult};

/// Vertices per sprite quad.
pub const VERTICES_PER_SPRITE: usize = 4;

/// Largest vertex capacity addressable by `u16` indices.
pub const MAX_VERTEX_CAPACITY: usize = u16::MAX as usize + 1;

/// Default number of sprites buffered before an automatic flush.
pub const DEFAULT_BATCH_SIZE: usize = 2048;

/// Default upper bound on texture units used by one draw call.
///
/// Matches the sampled-texture and sampler limits of wgpu's default
/// `Limits`, so the generated bind group fits without raising limits.
pub const DEFAULT_MAX_TEXTURES: u32 = 16;

/// Default number of geometry ring slots created up front.
pub const DEFAULT_GEOMETRY_POOL_SIZE: usize = 2;

/// Batch renderer configuration.
///
/// ```
/// use spritebatch::BatchConfig;
///
/// let config = BatchConfig::default()
///     .with_batch_size(1024)
///     .with_max_textures(8);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.vertex_capacity(), 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Sprites buffered before an automatic flush.
    pub batch_size: usize,
    /// Recommended upper bound on texture units per draw call. The effective
    /// value is further limited by the backend and the shader probe.
    pub max_textures: u32,
    /// Overrides the backend's answer to "may one GPU buffer be re-uploaded
    /// several times within a frame". `None` asks the backend.
    pub can_upload_same_buffer: Option<bool>,
    /// Geometry ring slots created by `context_change`.
    pub geometry_pool_size: usize,
    /// Force single-texture batching (one texture unit).
    pub legacy: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_textures: DEFAULT_MAX_TEXTURES,
            can_upload_same_buffer: None,
            geometry_pool_size: DEFAULT_GEOMETRY_POOL_SIZE,
            legacy: false,
        }
    }
}

impl BatchConfig {
    /// Set the number of sprites buffered before an automatic flush.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the recommended texture-unit bound.
    pub fn with_max_textures(mut self, max_textures: u32) -> Self {
        self.max_textures = max_textures;
        self
    }

    /// Override the backend's same-buffer upload capability.
    pub fn with_can_upload_same_buffer(mut self, allowed: bool) -> Self {
        self.can_upload_same_buffer = Some(allowed);
        self
    }

    /// Set the initial geometry ring size.
    pub fn with_geometry_pool_size(mut self, size: usize) -> Self {
        self.geometry_pool_size = size;
        self
    }

    /// Force single-texture batching.
    pub fn with_legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    /// Vertex capacity of one batch.
    pub fn vertex_capacity(&self) -> usize {
        self.batch_size * VERTICES_PER_SPRITE
    }

    /// Check the configuration for values the renderer cannot honor.
    pub fn validate(&self) -> BatchResult<()> {
        if self.max_textures == 0 {
            return Err(BatchError::InvalidTextureCount);
        }

        let requested = self.vertex_capacity();
        if requested == 0 || requested > MAX_VERTEX_CAPACITY {
            return Err(BatchError::InvalidBatchSize {
                requested,
                max: MAX_VERTEX_CAPACITY,
            });
        }

        Ok(())
    }
}
