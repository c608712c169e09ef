//! Packed tint helpers.
//!
//! Vertex colors travel as one `u32` per vertex that the shader reads as
//! `unorm8x4`. On little-endian targets the word `0xAABBGGRR` therefore
//! arrives as `vec4(r, g, b, a)`.

/// Swap a `0xRRGGBB` color into the `0xBBGGRR` order the vertex color
/// attribute expects.
#[inline]
pub fn rgb_to_tint_rgb(rgb: u32) -> u32 {
    ((rgb >> 16) & 0xff) | (rgb & 0xff00) | ((rgb & 0xff) << 16)
}

#[inline]
fn alpha_byte(alpha: f32) -> u32 {
    ((alpha * 255.0) as u32).min(255)
}

/// Combine a 24-bit tint with alpha without touching the color channels.
#[inline]
pub fn pack_tint_alpha(tint_rgb: u32, alpha: f32) -> u32 {
    (alpha_byte(alpha) << 24) | (tint_rgb & 0x00ff_ffff)
}

/// Combine a 24-bit tint with alpha, multiplying the color channels by alpha.
///
/// Channels are rounded to nearest. `alpha == 1.0` skips the multiply and
/// `alpha == 0.0` yields a fully zeroed word.
pub fn premultiply_tint(tint_rgb: u32, alpha: f32) -> u32 {
    if alpha == 1.0 {
        return pack_tint_alpha(tint_rgb, 1.0);
    }
    if alpha <= 0.0 {
        return 0;
    }

    let scale = |channel: u32| ((channel as f32 * alpha) + 0.5) as u32;
    let hi = scale((tint_rgb >> 16) & 0xff);
    let mid = scale((tint_rgb >> 8) & 0xff);
    let lo = scale(tint_rgb & 0xff);

    (alpha_byte(alpha) << 24) | (hi << 16) | (mid << 8) | lo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_swap() {
        assert_eq!(rgb_to_tint_rgb(0x112233), 0x332211);
        assert_eq!(rgb_to_tint_rgb(0xffffff), 0xffffff);
    }

    #[test]
    fn test_opaque_short_circuit() {
        assert_eq!(premultiply_tint(0x336699, 1.0), 0xff33_6699);
    }

    #[test]
    fn test_transparent_is_zero() {
        assert_eq!(premultiply_tint(0xffffff, 0.0), 0);
    }

    #[test]
    fn test_half_alpha_rounds_channels() {
        // 0xff * 0.5 + 0.5 = 128, 0x01 * 0.5 + 0.5 = 1
        let packed = premultiply_tint(0xff_01_00, 0.5);
        assert_eq!(packed >> 24, 127);
        assert_eq!((packed >> 16) & 0xff, 128);
        assert_eq!((packed >> 8) & 0xff, 1);
        assert_eq!(packed & 0xff, 0);
    }

    #[test]
    fn test_pack_tint_alpha_keeps_channels() {
        assert_eq!(pack_tint_alpha(0xabcdef, 0.5), (127 << 24) | 0xabcdef);
    }
}
