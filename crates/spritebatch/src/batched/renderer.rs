//! The batch renderer: buffering, flushing and the frame lifecycle.

use std::sync::Arc;

use spritebatch_core::profiling::{profile_function, profile_scope};

use crate::backend::{BatchBackend, ProgramId};
use crate::config::{BatchConfig, MAX_VERTEX_CAPACITY};
use crate::error::BatchResult;
use crate::viewable_buffer::ViewableBuffer;

use super::builder::{BatchBuilder, BuildContext};
use super::capability::resolve_max_textures;
use super::draw_call::BatchDrawCall;
use super::geometry::GeometryRing;
use super::plugin::{BatchPlugin, SpritePlugin};
use super::pool::{ATTRIBUTE_BLOCK, INDEX_BLOCK, SizeClassPool};
use super::texture_array::BatchTextureArray;
use super::types::{BatchStats, Batchable, Staging};

/// State derived from the backend by `context_change`.
#[derive(Debug)]
struct ContextState {
    max_textures: u32,
    program: ProgramId,
    ring: GeometryRing,
}

/// Accumulates renderable items and draws them in as few draw calls as the
/// texture-unit limit and blend changes allow.
///
/// Items are drawn in the order they are passed to [`render`](Self::render).
/// Nothing is drawn until [`flush`](Self::flush) runs, either explicitly,
/// from [`stop`](Self::stop), or automatically when the next item would
/// overflow the vertex capacity.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use spritebatch::mock::MockBatchBackend;
/// use spritebatch::{BatchConfig, BatchRenderer, Quad, Texture};
///
/// let backend = Arc::new(MockBatchBackend::new());
/// let mut batcher = BatchRenderer::sprite(backend.clone(), BatchConfig::default()).unwrap();
///
/// let texture = Texture::new(32, 32);
/// batcher.start();
/// batcher.render(&Quad::new(texture.clone(), 0.0, 0.0, 32.0, 32.0));
/// batcher.render(&Quad::new(texture, 32.0, 0.0, 32.0, 32.0));
/// batcher.stop();
///
/// assert_eq!(backend.count_draws(), 1);
/// ```
pub struct BatchRenderer<P: BatchPlugin = SpritePlugin> {
    backend: Arc<dyn BatchBackend>,
    plugin: P,
    config: BatchConfig,
    context: ContextState,
    vertex_capacity: usize,

    staging: Staging,
    vertex_count: usize,
    index_count: usize,

    attribute_buffers: SizeClassPool<ViewableBuffer>,
    index_buffers: SizeClassPool<Box<[u16]>>,
    builder: BatchBuilder,
    stats: BatchStats,
}

impl BatchRenderer<SpritePlugin> {
    /// A renderer for textured sprites using the stock plugin.
    pub fn sprite(backend: Arc<dyn BatchBackend>, config: BatchConfig) -> BatchResult<Self> {
        Self::new(backend, SpritePlugin::new(), config)
    }
}

impl<P: BatchPlugin> BatchRenderer<P> {
    /// Validate `config` and set the renderer up against `backend`.
    pub fn new(backend: Arc<dyn BatchBackend>, mut plugin: P, config: BatchConfig) -> BatchResult<Self> {
        config.validate()?;
        let context = Self::create_context(&*backend, &mut plugin, &config)?;
        let vertex_capacity = config.vertex_capacity();

        Ok(Self {
            backend,
            plugin,
            config,
            context,
            vertex_capacity,
            staging: Staging::default(),
            vertex_count: 0,
            index_count: 0,
            attribute_buffers: SizeClassPool::new(ATTRIBUTE_BLOCK),
            index_buffers: SizeClassPool::new(INDEX_BLOCK),
            builder: BatchBuilder::default(),
            stats: BatchStats::default(),
        })
    }

    fn create_context(
        backend: &dyn BatchBackend,
        plugin: &mut P,
        config: &BatchConfig,
    ) -> BatchResult<ContextState> {
        let max_textures = resolve_max_textures(config, backend)?;
        let program = plugin.shader_generator().generate_program(max_textures)?;
        let program = backend.create_program(&program)?;

        let can_upload_same_buffer = config
            .can_upload_same_buffer
            .unwrap_or_else(|| backend.can_upload_same_buffer());
        let ring = GeometryRing::new(
            backend,
            plugin.geometry_layout(),
            config.geometry_pool_size,
            can_upload_same_buffer,
        );

        tracing::info!(
            plugin = plugin.name(),
            max_textures,
            can_upload_same_buffer,
            "batch renderer context ready"
        );

        Ok(ContextState {
            max_textures,
            program,
            ring,
        })
    }

    /// Re-derive the texture-unit count, program and geometry ring, e.g.
    /// after the GPU context was lost.
    ///
    /// On error the previous context is kept.
    pub fn context_change(&mut self) -> BatchResult<()> {
        let context = Self::create_context(&*self.backend, &mut self.plugin, &self.config)?;
        let mut previous = std::mem::replace(&mut self.context, context);
        previous.ring.destroy(&*self.backend);
        Ok(())
    }

    /// Bind the program (and the shared geometry, if any) before rendering.
    pub fn start(&mut self) {
        self.backend.bind_program(self.context.program);
        self.context.ring.bind_shared(&*self.backend);
    }

    /// Draw everything still buffered.
    pub fn stop(&mut self) {
        self.flush();
    }

    /// Start a new frame: flushes reuse geometry slots from the beginning of
    /// the ring and the statistics restart from zero.
    pub fn on_prerender(&mut self) {
        self.context.ring.reset();
        self.stats = BatchStats::default();
    }

    /// Buffer an item for the next flush.
    ///
    /// Items with an invalid texture or no vertices are skipped. Malformed
    /// items (odd or mismatched vertex arrays, out-of-range indices, more
    /// vertices than `u16` indices can address) are skipped with a warning.
    ///
    /// An item that does not fit in the current batch flushes it first. An
    /// item larger than a whole batch is drawn alone in a batch of its own.
    pub fn render<B: Batchable + ?Sized>(&mut self, item: &B) {
        let texture = item.texture();
        if !texture.is_valid() {
            tracing::trace!(texture = %texture.id(), "skipping item with invalid texture");
            return;
        }

        let positions = item.vertex_data();
        if positions.len() % 2 != 0 || item.uvs().len() != positions.len() {
            tracing::warn!(
                positions = positions.len(),
                uvs = item.uvs().len(),
                "skipping item with malformed vertex data"
            );
            return;
        }

        let vertex_count = positions.len() / 2;
        if vertex_count == 0 {
            tracing::trace!("skipping item without vertices");
            return;
        }
        if vertex_count > MAX_VERTEX_CAPACITY {
            tracing::warn!(
                vertex_count,
                max = MAX_VERTEX_CAPACITY,
                "skipping item beyond the u16 index range"
            );
            return;
        }

        if let Some(index) = item.indices().iter().find(|&&i| i as usize >= vertex_count) {
            tracing::warn!(index, vertex_count, "skipping item with out-of-range index");
            return;
        }

        if self.vertex_count > 0 && self.vertex_count + vertex_count > self.vertex_capacity {
            self.flush();
        }

        self.vertex_count += vertex_count;
        self.index_count += item.indices().len();
        self.staging.push(item);
    }

    /// Draw every buffered item and empty the buffer.
    pub fn flush(&mut self) {
        if self.vertex_count == 0 {
            self.staging.clear();
            return;
        }
        profile_function!();

        let vertex_size = self.plugin.vertex_size();
        let vertex_count = self.vertex_count;
        let index_count = self.index_count;

        let attributes = self
            .attribute_buffers
            .get_or_insert_with(vertex_count, |capacity| {
                ViewableBuffer::new(capacity * vertex_size * 4)
            });
        let indices = self
            .index_buffers
            .get_or_insert_with(index_count, |capacity| vec![0; capacity].into_boxed_slice());

        self.builder.build(
            &*self.backend,
            &mut BuildContext {
                plugin: &self.plugin,
                staging: &self.staging,
                attributes: attributes.uint32_view_mut(),
                indices: &mut indices[..],
            },
            self.context.max_textures as usize,
        );

        {
            profile_scope!("update_geometry");
            let vertex_bytes = self.builder.packed_words() * 4;
            self.context.ring.upload(
                &*self.backend,
                &attributes.raw_bytes()[..vertex_bytes],
                &indices[..self.builder.packed_indices()],
            );
        }

        let binds = self.builder.draw_batches(&*self.backend);
        self.builder.release_textures();

        let draw_calls = self.builder.draw_calls().len() as u32;
        let texture_arrays = self.builder.texture_arrays().len() as u32;
        tracing::debug!(
            items = self.staging.len(),
            vertex_count,
            index_count,
            texture_arrays,
            draw_calls,
            "flushed batch"
        );

        self.stats.flushes += 1;
        self.stats.draw_calls += draw_calls;
        self.stats.texture_arrays += texture_arrays;
        self.stats.vertices += vertex_count as u32;
        self.stats.indices += index_count as u32;
        self.stats.texture_binds += binds;

        self.staging.clear();
        self.vertex_count = 0;
        self.index_count = 0;
    }

    /// Release the renderer's geometries. Anything still buffered is dropped.
    pub fn destroy(mut self) {
        if !self.staging.elements.is_empty() {
            tracing::debug!(items = self.staging.len(), "dropping buffered items on destroy");
        }
        self.context.ring.destroy(&*self.backend);
        self.attribute_buffers.clear();
        self.index_buffers.clear();
        self.builder.reset();
    }

    /// Pooled attribute buffer with room for at least `vertex_count`
    /// vertices.
    pub fn attribute_buffer(&mut self, vertex_count: usize) -> &mut ViewableBuffer {
        let vertex_size = self.plugin.vertex_size();
        self.attribute_buffers
            .get_or_insert_with(vertex_count, |capacity| {
                ViewableBuffer::new(capacity * vertex_size * 4)
            })
    }

    /// Pooled index buffer with room for at least `index_count` indices.
    pub fn index_buffer(&mut self, index_count: usize) -> &mut [u16] {
        self.index_buffers
            .get_or_insert_with(index_count, |capacity| vec![0; capacity].into_boxed_slice())
    }

    /// Draw calls issued by the most recent flush.
    pub fn draw_calls(&self) -> &[BatchDrawCall] {
        self.builder.draw_calls()
    }

    /// Texture arrays built by the most recent flush. Their texture handles
    /// are already released; use [`BatchTextureArray::texture_ids`].
    pub fn texture_arrays(&self) -> &[BatchTextureArray] {
        self.builder.texture_arrays()
    }

    /// Texture units each draw call may use.
    pub fn max_textures(&self) -> u32 {
        self.context.max_textures
    }

    pub fn program(&self) -> ProgramId {
        self.context.program
    }

    pub fn geometry_ring(&self) -> &GeometryRing {
        &self.context.ring
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn backend(&self) -> &Arc<dyn BatchBackend> {
        &self.backend
    }

    /// Vertices a single flush can hold.
    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    /// Vertices buffered since the last flush.
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Indices buffered since the last flush.
    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Items buffered since the last flush.
    pub fn buffered_len(&self) -> usize {
        self.staging.len()
    }
}

impl<P: BatchPlugin + std::fmt::Debug> std::fmt::Debug for BatchRenderer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRenderer")
            .field("plugin", &self.plugin)
            .field("max_textures", &self.context.max_textures)
            .field("vertex_capacity", &self.vertex_capacity)
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .finish_non_exhaustive()
    }
}
