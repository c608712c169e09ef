//! Spritebatch
//!
//! Multi-texture sprite batching for 2D renderers: items are buffered, grouped
//! into draw calls that each sample from up to `max_textures` texture units,
//! packed into one interleaved vertex buffer, and drawn in submission order.
//!
//! The GPU side sits behind [`BatchBackend`]. [`WgpuBatchBackend`] drives
//! wgpu; the `mock` feature adds a recording backend for tests.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use spritebatch::mock::MockBatchBackend;
//! use spritebatch::{BatchConfig, BatchRenderer, BlendMode, Quad, Texture};
//!
//! let backend = Arc::new(MockBatchBackend::new().with_max_texture_units(4));
//! let mut batcher = BatchRenderer::sprite(backend.clone(), BatchConfig::default()).unwrap();
//!
//! let a = Texture::new(16, 16);
//! let b = Texture::new(16, 16);
//! batcher.on_prerender();
//! batcher.start();
//! batcher.render(&Quad::new(a.clone(), 0.0, 0.0, 16.0, 16.0));
//! batcher.render(&Quad::new(b, 16.0, 0.0, 16.0, 16.0));
//! batcher.render(&Quad::new(a, 32.0, 0.0, 16.0, 16.0).with_blend_mode(BlendMode::Add));
//! batcher.stop();
//!
//! assert_eq!(batcher.texture_arrays().len(), 1);
//! assert_eq!(batcher.draw_calls().len(), 2);
//! ```

pub mod backend;
pub mod batched;
pub mod blend;
pub mod color;
pub mod config;
pub mod context;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod texture;
pub mod viewable_buffer;
pub mod wgpu_backend;

pub use backend::{BatchBackend, GeometryId, ProgramId};
pub use batched::{
    BatchDrawCall, BatchElement, BatchGeometry, BatchPlugin, BatchProgram, BatchRenderer,
    BatchShaderGenerator, BatchStats, BatchTextureArray, Batchable, DrawMode, GeometryLayout,
    GeometryRing, Quad, SpritePlugin,
};
pub use blend::{BlendMode, premultiply_blend_mode};
pub use color::{pack_tint_alpha, premultiply_tint, rgb_to_tint_rgb};
pub use config::BatchConfig;
pub use context::{GraphicsContext, GraphicsContextDescriptor, GraphicsError};
pub use error::{BatchError, BatchResult};
pub use texture::{AlphaMode, Texture, TextureHandle, TextureId};
pub use viewable_buffer::ViewableBuffer;
pub use wgpu_backend::WgpuBatchBackend;
