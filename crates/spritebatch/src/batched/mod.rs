//! Multi-texture sprite batching.
//!
//! Items handed to [`BatchRenderer::render`] are buffered until a flush. A
//! flush groups the buffered items, in order, into [`BatchTextureArray`]s of
//! at most `max_textures` distinct textures, packs their vertices into one
//! interleaved buffer, and issues one [`BatchDrawCall`] per run of items
//! sharing a texture array and an effective blend mode.
//!
//! | Stage | Type |
//! |-------|------|
//! | Buffering | [`Batchable`], [`BatchRenderer::render`] |
//! | Unit assignment | [`BatchTextureArray`] |
//! | Packing | [`BatchPlugin::pack_interleaved_geometry`] |
//! | Upload | [`GeometryRing`], [`BatchGeometry`] |
//! | Drawing | [`BatchDrawCall`], [`BatchBackend`](crate::BatchBackend) |

mod builder;
pub mod capability;
mod draw_call;
mod geometry;
mod plugin;
pub mod pool;
mod renderer;
mod shader;
mod texture_array;
mod types;

pub use capability::{PROBE_TEMPLATE, generate_if_test_src, probe_max_if_statements, resolve_max_textures};
pub use draw_call::{BatchDrawCall, DrawMode};
pub use geometry::{BatchGeometry, GeometryLayout, GeometryRing, SPRITE_VERTEX_WORDS};
pub use plugin::{BatchPlugin, SpritePlugin};
pub use pool::SizeClassPool;
pub use renderer::BatchRenderer;
pub use shader::{
    BatchProgram, BatchShaderGenerator, DEFAULT_FRAGMENT_TEMPLATE, DEFAULT_VERTEX_SRC,
    TEXTURE_BIND_GROUP, generate_bindings_src, generate_sample_src, sampler_binding,
    texture_binding,
};
pub use texture_array::BatchTextureArray;
pub use types::{BatchElement, BatchStats, Batchable, Quad};
