//! Turning buffered elements into texture arrays and draw calls.

use spritebatch_core::profiling::profile_scope;

use crate::backend::BatchBackend;
use crate::blend::premultiply_blend_mode;
use crate::texture::{TextureHandle, next_batch_epoch};

use super::draw_call::{BatchDrawCall, DrawMode};
use super::plugin::BatchPlugin;
use super::texture_array::BatchTextureArray;
use super::types::Staging;

/// Everything one build pass reads from or packs into.
pub(crate) struct BuildContext<'a, P: BatchPlugin + ?Sized> {
    pub plugin: &'a P,
    pub staging: &'a Staging,
    pub attributes: &'a mut [u32],
    pub indices: &'a mut [u16],
}

/// Texture arrays and draw calls of the most recent flush.
///
/// Both pools are reused across flushes: texture arrays are cleared in place
/// and the draw call list keeps its capacity.
#[derive(Debug, Default)]
pub(crate) struct BatchBuilder {
    texture_arrays: Vec<BatchTextureArray>,
    array_count: usize,
    draw_calls: Vec<BatchDrawCall>,
    bound_textures: Vec<Option<TextureHandle>>,
    /// Next free word in the attribute buffer.
    a_index: usize,
    /// Next free slot in the index buffer.
    i_index: usize,
}

impl BatchBuilder {
    pub fn texture_arrays(&self) -> &[BatchTextureArray] {
        &self.texture_arrays[..self.array_count]
    }

    pub fn draw_calls(&self) -> &[BatchDrawCall] {
        &self.draw_calls
    }

    /// Words packed by the last build.
    pub fn packed_words(&self) -> usize {
        self.a_index
    }

    /// Indices packed by the last build.
    pub fn packed_indices(&self) -> usize {
        self.i_index
    }

    /// Forget the previous flush's arrays and draw calls.
    pub fn reset(&mut self) {
        for array in &mut self.texture_arrays[..self.array_count] {
            array.clear();
        }
        self.array_count = 0;
        self.draw_calls.clear();
        self.a_index = 0;
        self.i_index = 0;
    }

    /// Drop the texture handles held by the drawn arrays. Ids and units of
    /// the last flush stay readable.
    pub fn release_textures(&mut self) {
        for array in &mut self.texture_arrays[..self.array_count] {
            array.release_textures();
        }
    }

    /// Group the staged elements into texture arrays of at most
    /// `max_textures` distinct textures, pack their geometry and plan the
    /// draw calls.
    pub fn build<P: BatchPlugin + ?Sized>(
        &mut self,
        backend: &dyn BatchBackend,
        ctx: &mut BuildContext<'_, P>,
        max_textures: usize,
    ) {
        profile_scope!("build_textures_and_draw_calls");
        self.reset();

        self.bound_textures.clear();
        self.bound_textures.resize(max_textures, None);
        backend.copy_bound_textures(&mut self.bound_textures);

        let mode = ctx.plugin.draw_mode();
        let staging = ctx.staging;
        let elements = &staging.elements;
        let mut epoch = next_batch_epoch();
        let mut start = 0;
        self.open_array(max_textures);

        for (i, element) in elements.iter().enumerate() {
            let texture = &element.texture;
            if texture.batch_epoch() == epoch {
                continue;
            }

            if self.current_array().count() >= max_textures {
                self.finish_array(ctx, start, i, epoch, mode);
                start = i;
                epoch = next_batch_epoch();
                self.open_array(max_textures);
            }

            texture.set_batch_epoch(epoch);
            self.current_array_mut().push(texture.clone());
        }

        if self.current_array().count() > 0 {
            self.finish_array(ctx, start, elements.len(), epoch, mode);
        } else {
            self.array_count -= 1;
        }

        self.bound_textures.fill(None);
    }

    fn open_array(&mut self, max_textures: usize) {
        if self.texture_arrays.len() <= self.array_count {
            self.texture_arrays
                .push(BatchTextureArray::with_capacity(max_textures));
        }
        self.array_count += 1;
    }

    fn current_array(&self) -> &BatchTextureArray {
        &self.texture_arrays[self.array_count - 1]
    }

    fn current_array_mut(&mut self) -> &mut BatchTextureArray {
        &mut self.texture_arrays[self.array_count - 1]
    }

    fn finish_array<P: BatchPlugin + ?Sized>(
        &mut self,
        ctx: &mut BuildContext<'_, P>,
        start: usize,
        finish: usize,
        epoch: u64,
        mode: DrawMode,
    ) {
        let array_index = self.array_count - 1;
        self.texture_arrays[array_index].assign_units(&mut self.bound_textures, epoch);
        self.build_draw_calls(ctx, array_index, start, finish, mode);
    }

    /// Pack elements `start..finish`, which all draw from texture array
    /// `array_index`, opening a new draw call whenever the effective blend
    /// mode changes.
    fn build_draw_calls<P: BatchPlugin + ?Sized>(
        &mut self,
        ctx: &mut BuildContext<'_, P>,
        array_index: usize,
        start: usize,
        finish: usize,
        mode: DrawMode,
    ) {
        let plugin = ctx.plugin;
        let staging = ctx.staging;
        let vertex_size = plugin.vertex_size();
        let mut run_start = start;
        let mut draw_call = BatchDrawCall {
            tex_array: array_index,
            mode,
            start: self.i_index as u32,
            ..Default::default()
        };

        for i in start..finish {
            let buffered = &staging.elements[i];
            let blend = premultiply_blend_mode(
                buffered.texture.alpha_mode().is_premultiplied(),
                buffered.blend_mode,
            );

            if run_start < i && draw_call.blend != blend {
                draw_call.size = self.i_index as u32 - draw_call.start;
                self.draw_calls.push(draw_call);
                run_start = i;
                draw_call = BatchDrawCall {
                    tex_array: array_index,
                    mode,
                    start: self.i_index as u32,
                    ..Default::default()
                };
            }

            let element = staging.element(buffered);
            plugin.pack_interleaved_geometry(
                &element,
                &mut *ctx.attributes,
                &mut *ctx.indices,
                self.a_index,
                self.i_index,
            );
            self.a_index += element.vertex_count() * vertex_size;
            self.i_index += element.indices.len();
            draw_call.blend = blend;
        }

        if start < finish {
            draw_call.size = self.i_index as u32 - draw_call.start;
            self.draw_calls.push(draw_call);
        }
    }

    /// Issue the planned draw calls, binding a texture array's textures
    /// whenever the draw call's array differs from the previous one.
    ///
    /// Returns the number of texture binds issued.
    pub fn draw_batches(&self, backend: &dyn BatchBackend) -> u32 {
        profile_scope!("draw_batches");
        let mut current_array = None;
        let mut binds = 0;

        for draw_call in &self.draw_calls {
            if current_array != Some(draw_call.tex_array) {
                current_array = Some(draw_call.tex_array);
                let array = &self.texture_arrays[draw_call.tex_array];
                for (texture, unit) in array.elements().iter().zip(array.ids()) {
                    backend.bind_texture(texture, *unit);
                    binds += 1;
                }
            }

            tracing::trace!(
                tex_array = draw_call.tex_array,
                blend = ?draw_call.blend,
                start = draw_call.start,
                size = draw_call.size,
                "draw call"
            );
            backend.set_blend_mode(draw_call.blend);
            backend.draw_elements(
                draw_call.mode,
                draw_call.size,
                wgpu::IndexFormat::Uint16,
                draw_call.byte_offset(),
            );
        }

        binds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batched::geometry::SPRITE_VERTEX_WORDS;
    use crate::batched::plugin::SpritePlugin;
    use crate::batched::types::Quad;
    use crate::blend::BlendMode;
    use crate::mock::{BackendCall, MockBatchBackend};
    use crate::texture::{AlphaMode, Texture};

    fn build(staging: &Staging, backend: &MockBatchBackend, max_textures: usize) -> BatchBuilder {
        let plugin = SpritePlugin::new();
        let vertices: usize = staging.elements.iter().map(|e| e.vertex_count()).sum();
        let index_count: usize = staging.elements.iter().map(|e| e.index_count()).sum();
        let mut attributes = vec![0u32; vertices * SPRITE_VERTEX_WORDS];
        let mut indices = vec![0u16; index_count];
        let mut builder = BatchBuilder::default();
        builder.build(
            backend,
            &mut BuildContext {
                plugin: &plugin,
                staging,
                attributes: &mut attributes,
                indices: &mut indices,
            },
            max_textures,
        );
        builder
    }

    fn staging_for(quads: &[Quad]) -> Staging {
        let mut staging = Staging::default();
        for quad in quads {
            staging.push(quad);
        }
        staging
    }

    #[test]
    fn test_shared_texture_takes_one_slot() {
        let a = Texture::new(4, 4);
        let b = Texture::new(4, 4);
        let staging = staging_for(&[
            Quad::new(a.clone(), 0.0, 0.0, 1.0, 1.0),
            Quad::new(a.clone(), 1.0, 0.0, 1.0, 1.0),
            Quad::new(b.clone(), 2.0, 0.0, 1.0, 1.0),
        ]);

        let builder = build(&staging, &MockBatchBackend::new(), 4);
        assert_eq!(builder.texture_arrays().len(), 1);
        assert_eq!(builder.texture_arrays()[0].count(), 2);
        assert_eq!(builder.draw_calls().len(), 1);
        assert_eq!(builder.draw_calls()[0].size, 18);
    }

    #[test]
    fn test_full_array_starts_new_draw_call() {
        let quads: Vec<Quad> = (0..5)
            .map(|i| Quad::new(Texture::new(1, 1), i as f32, 0.0, 1.0, 1.0))
            .collect();
        let staging = staging_for(&quads);

        let builder = build(&staging, &MockBatchBackend::new(), 4);
        let counts: Vec<usize> = builder.texture_arrays().iter().map(|a| a.count()).collect();
        assert_eq!(counts, vec![4, 1]);

        let calls = builder.draw_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!((calls[0].start, calls[0].size), (0, 24));
        assert_eq!((calls[1].start, calls[1].size), (24, 6));
        assert_eq!(calls[1].tex_array, 1);
    }

    #[test]
    fn test_blend_change_splits_draw_call() {
        let a = Texture::new(1, 1);
        let staging = staging_for(&[
            Quad::new(a.clone(), 0.0, 0.0, 1.0, 1.0),
            Quad::new(a.clone(), 0.0, 0.0, 1.0, 1.0).with_blend_mode(BlendMode::Add),
        ]);

        let builder = build(&staging, &MockBatchBackend::new(), 4);
        assert_eq!(builder.texture_arrays().len(), 1);
        let calls = builder.draw_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].blend, BlendMode::Normal);
        assert_eq!(calls[1].blend, BlendMode::Add);
        assert_eq!(calls[1].start, 6);
    }

    #[test]
    fn test_straight_alpha_texture_remaps_blend() {
        let texture = Texture::with_alpha_mode(1, 1, AlphaMode::NoPremultipliedAlpha);
        let staging = staging_for(&[Quad::new(texture, 0.0, 0.0, 1.0, 1.0)]);

        let builder = build(&staging, &MockBatchBackend::new(), 4);
        assert_eq!(builder.draw_calls()[0].blend, BlendMode::NormalNpm);
    }

    #[test]
    fn test_empty_staging_builds_nothing() {
        let builder = build(&Staging::default(), &MockBatchBackend::new(), 4);
        assert!(builder.texture_arrays().is_empty());
        assert!(builder.draw_calls().is_empty());
    }

    #[test]
    fn test_resident_texture_keeps_its_unit() {
        let a = Texture::new(1, 1);
        let b = Texture::new(1, 1);
        let backend = MockBatchBackend::new();
        backend.bind_texture(&b, 2);
        b.set_batch_location(2);

        let staging = staging_for(&[
            Quad::new(a.clone(), 0.0, 0.0, 1.0, 1.0),
            Quad::new(b.clone(), 0.0, 0.0, 1.0, 1.0),
        ]);
        let builder = build(&staging, &backend, 4);
        assert_eq!(builder.texture_arrays()[0].ids(), &[0, 2]);
    }

    #[test]
    fn test_draw_batches_binds_each_array_once() {
        let a = Texture::new(1, 1);
        let staging = staging_for(&[
            Quad::new(a.clone(), 0.0, 0.0, 1.0, 1.0),
            Quad::new(a.clone(), 0.0, 0.0, 1.0, 1.0).with_blend_mode(BlendMode::Add),
        ]);
        let backend = MockBatchBackend::new();
        let builder = build(&staging, &backend, 4);
        backend.clear_calls();

        assert_eq!(builder.draw_batches(&backend), 1);
        assert_eq!(backend.count_texture_binds(), 1);
        let draws: Vec<(u32, u64)> = backend
            .calls()
            .iter()
            .filter_map(|call| match call {
                BackendCall::DrawElements {
                    count, byte_offset, ..
                } => Some((*count, *byte_offset)),
                _ => None,
            })
            .collect();
        assert_eq!(draws, vec![(6, 0), (6, 12)]);
    }
}
