//! [`BatchBackend`] on top of wgpu.
//!
//! wgpu has no global texture-unit table or immediate draws, so the backend
//! emulates both: it tracks which texture sits in each unit, and records every
//! `draw_elements` together with the pipeline, geometry buffers and a bind
//! group snapshot of the unit table. [`WgpuBatchBackend::render`] replays the
//! recorded draws into a render pass.
//!
//! Frame usage:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use spritebatch::{BatchConfig, BatchRenderer, GraphicsContext, Quad, Texture, WgpuBatchBackend};
//!
//! let ctx = GraphicsContext::new_owned_sync().expect("graphics context");
//! let backend = Arc::new(WgpuBatchBackend::new(ctx.clone(), wgpu::TextureFormat::Rgba8UnormSrgb));
//! let mut batcher = BatchRenderer::sprite(backend.clone(), BatchConfig::default()).unwrap();
//!
//! let texture = Texture::new(2, 2);
//! backend.upload_texture(&texture, &[255; 16]);
//!
//! backend.begin_frame();
//! backend.set_projection(spritebatch::wgpu_backend::orthographic(800.0, 600.0));
//! batcher.on_prerender();
//! batcher.start();
//! batcher.render(&Quad::new(texture, 10.0, 10.0, 64.0, 64.0));
//! batcher.stop();
//! // backend.render(&mut pass) inside a render pass, then submit.
//! ```

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use parking_lot::Mutex;
use spritebatch_core::alloc::HashMap;
use spritebatch_core::profiling::profile_function;

use crate::backend::{BatchBackend, GeometryId, ProgramId};
use crate::batched::{
    BatchProgram, DrawMode, GeometryLayout, TEXTURE_BIND_GROUP, sampler_binding, texture_binding,
};
use crate::blend::BlendMode;
use crate::context::GraphicsContext;
use crate::error::{BatchError, BatchResult};
use crate::texture::{TextureHandle, TextureId};

const GLOBALS_BIND_GROUP: u32 = 0;

/// Uniforms shared by every batch program.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Globals {
    /// Column-major projection from item space to clip space.
    pub projection: [[f32; 4]; 4],
    /// Multiplied into every vertex color.
    pub tint: [f32; 4],
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            projection: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            tint: [1.0; 4],
        }
    }
}

/// Projection mapping pixel coordinates (origin top-left, y down) of a
/// `width` x `height` target to clip space.
pub fn orthographic(width: f32, height: f32) -> [[f32; 4]; 4] {
    [
        [2.0 / width, 0.0, 0.0, 0.0],
        [0.0, -2.0 / height, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0, 1.0],
    ]
}

struct GpuTexture {
    _texture: Option<wgpu::Texture>,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

struct GpuProgram {
    module: wgpu::ShaderModule,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    max_textures: u32,
    vertex_entry: &'static str,
    fragment_entry: &'static str,
}

struct GpuGeometry {
    layout: GeometryLayout,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    blend: BlendMode,
    mode: DrawMode,
}

struct RecordedDraw {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    indices: std::ops::Range<u32>,
}

struct WgpuState {
    textures: HashMap<TextureId, GpuTexture>,
    bound: Vec<Option<TextureHandle>>,
    programs: Vec<GpuProgram>,
    geometries: Vec<Option<GpuGeometry>>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    program: Option<ProgramId>,
    geometry: Option<GeometryId>,
    blend: BlendMode,
    /// Bind group of the current unit table, rebuilt after a bind changes it.
    texture_bind_group: Option<wgpu::BindGroup>,

    draws: Vec<RecordedDraw>,
}

/// A [`BatchBackend`] that records draws against wgpu resources.
pub struct WgpuBatchBackend {
    context: Arc<GraphicsContext>,
    format: wgpu::TextureFormat,
    max_texture_units: u32,
    globals_buffer: wgpu::Buffer,
    globals_layout: wgpu::BindGroupLayout,
    globals_bind_group: wgpu::BindGroup,
    fallback: GpuTexture,
    state: Mutex<WgpuState>,
}

impl WgpuBatchBackend {
    /// Create a backend drawing into targets of `format`.
    pub fn new(context: Arc<GraphicsContext>, format: wgpu::TextureFormat) -> Self {
        profile_function!();
        let device = &context.device;

        let limits = device.limits();
        let max_texture_units = limits
            .max_sampled_textures_per_shader_stage
            .min(limits.max_samplers_per_shader_stage)
            .min(limits.max_bindings_per_bind_group / 2);

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("batch_globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        context
            .queue
            .write_buffer(&globals_buffer, 0, bytemuck::bytes_of(&Globals::default()));

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("batch_globals_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("batch_globals_bg"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let fallback = create_fallback_texture(device, &context.queue);

        tracing::info!(max_texture_units, ?format, "created wgpu batch backend");

        Self {
            context,
            format,
            max_texture_units,
            globals_buffer,
            globals_layout,
            globals_bind_group,
            fallback,
            state: Mutex::new(WgpuState {
                textures: HashMap::new(),
                bound: vec![None; max_texture_units as usize],
                programs: Vec::new(),
                geometries: Vec::new(),
                pipelines: HashMap::new(),
                program: None,
                geometry: None,
                blend: BlendMode::Normal,
                texture_bind_group: None,
                draws: Vec::new(),
            }),
        }
    }

    pub fn context(&self) -> &Arc<GraphicsContext> {
        &self.context
    }

    /// Attach GPU data to `texture`. Units holding a texture without GPU data
    /// sample a 1x1 white texture.
    pub fn register_texture(
        &self,
        texture: &TextureHandle,
        view: wgpu::TextureView,
        sampler: wgpu::Sampler,
    ) {
        let mut state = self.state.lock();
        state.textures.insert(
            texture.id(),
            GpuTexture {
                _texture: None,
                view,
                sampler,
            },
        );
        state.texture_bind_group = None;
    }

    /// Create an `Rgba8UnormSrgb` GPU texture for `texture` from tightly
    /// packed RGBA bytes.
    pub fn upload_texture(&self, texture: &TextureHandle, rgba: &[u8]) {
        let device = &self.context.device;
        let size = wgpu::Extent3d {
            width: texture.width(),
            height: texture.height(),
            depth_or_array_layers: 1,
        };
        let gpu = device.create_texture(&wgpu::TextureDescriptor {
            label: texture.label(),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * texture.width()),
                rows_per_image: Some(texture.height()),
            },
            size,
        );

        let view = gpu.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("batch_texture_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let mut state = self.state.lock();
        state.textures.insert(
            texture.id(),
            GpuTexture {
                _texture: Some(gpu),
                view,
                sampler,
            },
        );
        state.texture_bind_group = None;
    }

    /// Drop the GPU data attached to `texture`.
    pub fn unregister_texture(&self, texture: &TextureHandle) {
        let mut state = self.state.lock();
        state.textures.remove(&texture.id());
        state.texture_bind_group = None;
    }

    pub fn set_globals(&self, globals: &Globals) {
        self.context
            .queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(globals));
    }

    pub fn set_projection(&self, projection: [[f32; 4]; 4]) {
        self.set_globals(&Globals {
            projection,
            ..Default::default()
        });
    }

    /// Forget the draws recorded for the previous frame.
    pub fn begin_frame(&self) {
        self.state.lock().draws.clear();
    }

    /// Number of draws recorded since [`begin_frame`](Self::begin_frame).
    pub fn recorded_draws(&self) -> usize {
        self.state.lock().draws.len()
    }

    /// Replay the recorded draws into `pass`.
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        profile_function!();
        let state = self.state.lock();
        pass.push_debug_group("WgpuBatchBackend::render");
        pass.set_bind_group(GLOBALS_BIND_GROUP, &self.globals_bind_group, &[]);

        for draw in &state.draws {
            pass.set_pipeline(&draw.pipeline);
            pass.set_bind_group(TEXTURE_BIND_GROUP, &draw.bind_group, &[]);
            pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
            pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(draw.indices.clone(), 0, 0..1);
        }

        pass.pop_debug_group();
    }

    fn texture_bind_group(&self, state: &mut WgpuState, program: ProgramId) -> Option<wgpu::BindGroup> {
        if let Some(bind_group) = &state.texture_bind_group {
            return Some(bind_group.clone());
        }

        let gpu_program = state.programs.get(program.0 as usize)?;
        let units = gpu_program.max_textures;
        let resources: Vec<&GpuTexture> = (0..units as usize)
            .map(|unit| {
                state
                    .bound
                    .get(unit)
                    .and_then(Option::as_ref)
                    .and_then(|texture| state.textures.get(&texture.id()))
                    .unwrap_or(&self.fallback)
            })
            .collect();

        let mut entries = Vec::with_capacity(resources.len() * 2);
        for (unit, gpu) in resources.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: texture_binding(unit as u32),
                resource: wgpu::BindingResource::TextureView(&gpu.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: sampler_binding(unit as u32),
                resource: wgpu::BindingResource::Sampler(&gpu.sampler),
            });
        }

        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("batch_textures_bg"),
                layout: &gpu_program.texture_layout,
                entries: &entries,
            });
        state.texture_bind_group = Some(bind_group.clone());
        Some(bind_group)
    }

    fn pipeline(&self, state: &mut WgpuState, key: PipelineKey) -> Option<wgpu::RenderPipeline> {
        if let Some(pipeline) = state.pipelines.get(&key) {
            return Some(pipeline.clone());
        }

        let program = state.programs.get(key.program.0 as usize)?;
        let layout = state
            .geometry
            .and_then(|id| state.geometries.get(id.0 as usize))
            .and_then(Option::as_ref)
            .map(|geometry| geometry.layout)
            .unwrap_or(GeometryLayout::SPRITE);

        tracing::debug!(program = key.program.0, blend = ?key.blend, mode = ?key.mode, "creating batch pipeline");
        let pipeline = self
            .context
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("batch_pipeline"),
                layout: Some(&program.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.module,
                    entry_point: Some(program.vertex_entry),
                    buffers: &[layout.vertex_buffer_layout()],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.module,
                    entry_point: Some(program.fragment_entry),
                    targets: &[Some(key.blend.to_color_target_state(self.format))],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: key.mode.to_topology(),
                    strip_index_format: key.mode.strip_index_format(),
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        state.pipelines.insert(key, pipeline.clone());
        Some(pipeline)
    }

    fn validate_module(&self, label: &str, source: &str) -> Result<wgpu::ShaderModule, String> {
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(module),
        }
    }
}

impl BatchBackend for WgpuBatchBackend {
    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    /// `queue.write_buffer` lands before the frame's submission executes, so
    /// two uploads to one buffer in a frame would both be seen as the last.
    fn can_upload_same_buffer(&self) -> bool {
        false
    }

    fn compile_probe(&self, source: &str) -> bool {
        match self.validate_module("batch_probe", source) {
            Ok(_) => true,
            Err(message) => {
                tracing::debug!(%message, "probe shader rejected");
                false
            }
        }
    }

    fn copy_bound_textures(&self, out: &mut [Option<TextureHandle>]) {
        let state = self.state.lock();
        for (unit, slot) in out.iter_mut().enumerate() {
            *slot = state.bound.get(unit).cloned().flatten();
        }
    }

    fn bind_texture(&self, texture: &TextureHandle, unit: u32) {
        let mut state = self.state.lock();
        let Some(slot) = state.bound.get_mut(unit as usize) else {
            tracing::warn!(unit, "texture unit out of range");
            return;
        };
        if slot.as_ref().is_some_and(|bound| bound.id() == texture.id()) {
            return;
        }
        *slot = Some(texture.clone());
        state.texture_bind_group = None;
    }

    fn create_program(&self, program: &BatchProgram) -> BatchResult<ProgramId> {
        profile_function!();
        let module = self
            .validate_module("batch_program", &program.source)
            .map_err(|message| BatchError::ShaderCompilation { message })?;

        let device = &self.context.device;
        let mut entries = Vec::with_capacity(program.max_textures as usize * 2);
        for unit in 0..program.max_textures {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: texture_binding(unit),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: sampler_binding(unit),
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("batch_textures_layout"),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("batch_pipeline_layout"),
            bind_group_layouts: &[&self.globals_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let mut state = self.state.lock();
        let id = ProgramId(state.programs.len() as u32);
        state.programs.push(GpuProgram {
            module,
            texture_layout,
            pipeline_layout,
            max_textures: program.max_textures,
            vertex_entry: program.vertex_entry,
            fragment_entry: program.fragment_entry,
        });
        tracing::info!(program = id.0, max_textures = program.max_textures, "created batch program");
        Ok(id)
    }

    fn bind_program(&self, program: ProgramId) {
        let mut state = self.state.lock();
        if state.program != Some(program) {
            state.program = Some(program);
            state.texture_bind_group = None;
        }
    }

    fn create_geometry(&self, layout: &GeometryLayout) -> GeometryId {
        let mut state = self.state.lock();
        let id = GeometryId(state.geometries.len() as u32);
        state.geometries.push(Some(GpuGeometry {
            layout: *layout,
            vertex_buffer: None,
            index_buffer: None,
        }));
        id
    }

    fn upload_geometry(&self, geometry: GeometryId, vertices: &[u8], indices: &[u16]) {
        let device = &self.context.device;
        let queue = &self.context.queue;
        let mut state = self.state.lock();
        let Some(Some(gpu)) = state.geometries.get_mut(geometry.0 as usize) else {
            tracing::warn!(geometry = geometry.0, "upload to unknown geometry");
            return;
        };

        // Buffer writes must be a multiple of four bytes.
        let index_bytes: std::borrow::Cow<'_, [u16]> = if indices.len() % 2 == 0 {
            indices.into()
        } else {
            let mut padded = indices.to_vec();
            padded.push(0);
            padded.into()
        };

        write_growing(
            device,
            queue,
            &mut gpu.vertex_buffer,
            "batch_vertex_buffer",
            wgpu::BufferUsages::VERTEX,
            vertices,
        );
        write_growing(
            device,
            queue,
            &mut gpu.index_buffer,
            "batch_index_buffer",
            wgpu::BufferUsages::INDEX,
            bytemuck::cast_slice(&*index_bytes),
        );
    }

    fn bind_geometry(&self, geometry: GeometryId) {
        self.state.lock().geometry = Some(geometry);
    }

    fn destroy_geometry(&self, geometry: GeometryId) {
        let mut state = self.state.lock();
        if let Some(slot) = state.geometries.get_mut(geometry.0 as usize) {
            *slot = None;
        }
        if state.geometry == Some(geometry) {
            state.geometry = None;
        }
    }

    fn set_blend_mode(&self, blend: BlendMode) {
        self.state.lock().blend = blend;
    }

    fn draw_elements(
        &self,
        mode: DrawMode,
        count: u32,
        _format: wgpu::IndexFormat,
        byte_offset: u64,
    ) {
        let mut state = self.state.lock();
        let (Some(program), Some(geometry)) = (state.program, state.geometry) else {
            tracing::warn!("draw without a bound program and geometry");
            return;
        };
        let Some((vertex_buffer, index_buffer)) = state
            .geometries
            .get(geometry.0 as usize)
            .and_then(Option::as_ref)
            .and_then(|gpu| Some((gpu.vertex_buffer.clone()?, gpu.index_buffer.clone()?)))
        else {
            tracing::warn!(geometry = geometry.0, "draw from a geometry without data");
            return;
        };

        let key = PipelineKey {
            program,
            blend: state.blend,
            mode,
        };
        let (Some(pipeline), Some(bind_group)) = (
            self.pipeline(&mut state, key),
            self.texture_bind_group(&mut state, program),
        ) else {
            tracing::warn!(program = program.0, "draw with an unknown program");
            return;
        };

        let first = (byte_offset / std::mem::size_of::<u16>() as u64) as u32;
        state.draws.push(RecordedDraw {
            pipeline,
            bind_group,
            vertex_buffer,
            index_buffer,
            indices: first..first + count,
        });
    }
}

/// Write `data` to `buffer`, replacing it with a larger one first if needed.
fn write_growing(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &mut Option<wgpu::Buffer>,
    label: &'static str,
    usage: wgpu::BufferUsages,
    data: &[u8],
) {
    if data.is_empty() {
        return;
    }

    let required = data.len() as u64;
    if buffer.as_ref().is_none_or(|b| b.size() < required) {
        let size = required.next_power_of_two().max(wgpu::COPY_BUFFER_ALIGNMENT);
        tracing::debug!(label, size, "allocating geometry buffer");
        *buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
    }

    if let Some(buffer) = buffer {
        queue.write_buffer(buffer, 0, data);
    }
}

/// 1x1 white texture sampled by units with nothing bound.
fn create_fallback_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: 1,
        height: 1,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("batch_fallback_texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[255, 255, 255, 255],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("batch_fallback_sampler"),
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    GpuTexture {
        _texture: Some(texture),
        view,
        sampler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batched::{BatchShaderGenerator, PROBE_TEMPLATE, generate_if_test_src};

    #[test]
    fn test_globals_size() {
        assert_eq!(std::mem::size_of::<Globals>(), 80);
    }

    #[test]
    fn test_orthographic_maps_corners() {
        let m = orthographic(800.0, 600.0);
        let apply = |x: f32, y: f32| {
            (
                m[0][0] * x + m[1][0] * y + m[3][0],
                m[0][1] * x + m[1][1] * y + m[3][1],
            )
        };
        assert_eq!(apply(0.0, 0.0), (-1.0, 1.0));
        assert_eq!(apply(800.0, 600.0), (1.0, -1.0));
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_generated_program_compiles() {
        let ctx = GraphicsContext::new_owned_sync().expect("graphics context");
        let backend = WgpuBatchBackend::new(ctx, wgpu::TextureFormat::Rgba8UnormSrgb);
        let mut generator = BatchShaderGenerator::default();
        for max in [1, 2, 8, backend.max_texture_units().min(16)] {
            let program = generator.generate_program(max).expect("program");
            assert!(backend.create_program(&program).is_ok(), "max_textures = {max}");
        }
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn test_probe_compiles() {
        let ctx = GraphicsContext::new_owned_sync().expect("graphics context");
        let backend = WgpuBatchBackend::new(ctx, wgpu::TextureFormat::Rgba8UnormSrgb);
        let source = PROBE_TEMPLATE.replace("%forloop%", &generate_if_test_src(16));
        assert!(backend.compile_probe(&source));
        assert!(!backend.compile_probe("fn broken( {"));
    }
}
