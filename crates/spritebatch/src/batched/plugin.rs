//! Plugins describe what a batch renderer packs and which shaders draw it.

use crate::color::{pack_tint_alpha, premultiply_tint, rgb_to_tint_rgb};

use super::draw_call::DrawMode;
use super::geometry::{GeometryLayout, SPRITE_VERTEX_WORDS};
use super::shader::BatchShaderGenerator;
use super::types::BatchElement;

/// The parts of a batch renderer that vary per kind of item.
///
/// The default [`pack_interleaved_geometry`](Self::pack_interleaved_geometry)
/// writes the stock sprite layout; plugins with a different
/// [`vertex_size`](Self::vertex_size) must override it.
pub trait BatchPlugin: Send {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// 32-bit words per packed vertex.
    fn vertex_size(&self) -> usize {
        SPRITE_VERTEX_WORDS
    }

    fn geometry_layout(&self) -> GeometryLayout {
        GeometryLayout::SPRITE
    }

    fn draw_mode(&self) -> DrawMode {
        DrawMode::Triangles
    }

    fn shader_generator(&mut self) -> &mut BatchShaderGenerator;

    /// Pack one element's vertices at word `a_index` of `attributes` and its
    /// indices at `i_index` of `indices`.
    ///
    /// Indices are rebased by the number of vertices already packed so they
    /// address the shared vertex buffer. The element's texture already
    /// carries its assigned unit.
    fn pack_interleaved_geometry(
        &self,
        element: &BatchElement<'_>,
        attributes: &mut [u32],
        indices: &mut [u16],
        a_index: usize,
        i_index: usize,
    ) {
        let vertex_size = self.vertex_size();
        let base_vertex = (a_index / vertex_size) as u16;

        let alpha = element.alpha.min(1.0);
        let tint = rgb_to_tint_rgb(element.tint);
        let argb = if alpha < 1.0 && element.texture.alpha_mode().is_premultiplied() {
            premultiply_tint(tint, alpha)
        } else {
            pack_tint_alpha(tint, alpha)
        };
        let texture_unit = (element.texture.batch_location().unwrap_or(0) as f32).to_bits();

        let vertices = attributes[a_index..]
            .chunks_exact_mut(vertex_size)
            .zip(element.positions.chunks_exact(2).zip(element.uvs.chunks_exact(2)));
        for (vertex, (position, uv)) in vertices {
            vertex[0] = position[0].to_bits();
            vertex[1] = position[1].to_bits();
            vertex[2] = uv[0].to_bits();
            vertex[3] = uv[1].to_bits();
            vertex[4] = argb;
            vertex[5] = texture_unit;
        }

        for (slot, index) in indices[i_index..].iter_mut().zip(element.indices) {
            *slot = base_vertex + index;
        }
    }
}

/// The stock plugin for textured, tinted sprites and meshes.
#[derive(Debug, Default)]
pub struct SpritePlugin {
    shader_generator: BatchShaderGenerator,
}

impl SpritePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom shader sources with the stock vertex layout.
    pub fn with_shader_generator(shader_generator: BatchShaderGenerator) -> Self {
        Self { shader_generator }
    }
}

impl BatchPlugin for SpritePlugin {
    fn name(&self) -> &'static str {
        "sprite"
    }

    fn shader_generator(&mut self) -> &mut BatchShaderGenerator {
        &mut self.shader_generator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::BlendMode;
    use crate::texture::{AlphaMode, Texture, TextureHandle};

    fn element<'a>(
        texture: &'a TextureHandle,
        positions: &'a [f32],
        uvs: &'a [f32],
        indices: &'a [u16],
        alpha: f32,
    ) -> BatchElement<'a> {
        BatchElement {
            texture,
            positions,
            uvs,
            indices,
            blend_mode: BlendMode::Normal,
            alpha,
            tint: 0x336699,
        }
    }

    #[test]
    fn test_packs_interleaved_words() {
        let texture = Texture::new(2, 2);
        texture.set_batch_location(3);
        let positions = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let uvs = [0.0, 0.5, 1.0, 0.5, 1.0, 1.0];
        let tri = [0, 1, 2];

        let mut attributes = vec![0u32; 6 * 5];
        let mut indices = vec![0u16; 6];
        let plugin = SpritePlugin::new();
        // Two vertices already packed ahead of this element.
        plugin.pack_interleaved_geometry(
            &element(&texture, &positions, &uvs, &tri, 1.0),
            &mut attributes,
            &mut indices,
            12,
            3,
        );

        let vertex = &attributes[18..24];
        assert_eq!(f32::from_bits(vertex[0]), 3.0);
        assert_eq!(f32::from_bits(vertex[1]), 4.0);
        assert_eq!(f32::from_bits(vertex[2]), 1.0);
        assert_eq!(f32::from_bits(vertex[3]), 0.5);
        assert_eq!(vertex[4], 0xff99_6633);
        assert_eq!(f32::from_bits(vertex[5]), 3.0);
        assert_eq!(&indices[3..6], &[2, 3, 4]);
        assert_eq!(&attributes[..12], &[0; 12]);
    }

    #[test]
    fn test_premultiplies_for_premultiplied_textures() {
        let texture = Texture::with_alpha_mode(1, 1, AlphaMode::PremultipliedAlpha);
        let mut attributes = vec![0u32; 6];
        let mut indices = vec![0u16; 1];
        SpritePlugin::new().pack_interleaved_geometry(
            &element(&texture, &[0.0, 0.0], &[0.0, 0.0], &[0], 0.5),
            &mut attributes,
            &mut indices,
            0,
            0,
        );
        assert_eq!(attributes[4], premultiply_tint(0x996633, 0.5));
    }

    #[test]
    fn test_straight_alpha_textures_keep_channels() {
        let texture = Texture::with_alpha_mode(1, 1, AlphaMode::NoPremultipliedAlpha);
        let mut attributes = vec![0u32; 6];
        let mut indices = vec![0u16; 1];
        SpritePlugin::new().pack_interleaved_geometry(
            &element(&texture, &[0.0, 0.0], &[0.0, 0.0], &[0], 0.5),
            &mut attributes,
            &mut indices,
            0,
            0,
        );
        assert_eq!(attributes[4], (127 << 24) | 0x996633);
    }

    #[test]
    fn test_alpha_clamped_to_one() {
        let texture = Texture::new(1, 1);
        let mut attributes = vec![0u32; 6];
        let mut indices = vec![0u16; 1];
        SpritePlugin::new().pack_interleaved_geometry(
            &element(&texture, &[0.0, 0.0], &[0.0, 0.0], &[0], 3.0),
            &mut attributes,
            &mut indices,
            0,
            0,
        );
        assert_eq!(attributes[4] >> 24, 0xff);
    }
}
