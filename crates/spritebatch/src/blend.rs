//! Blend modes understood by the batcher.
//!
//! Colors leave the batch shader premultiplied by alpha. Textures whose data
//! is not premultiplied are drawn with the `*Npm` variants instead, which is
//! what [`premultiply_blend_mode`] selects.

use wgpu::{BlendComponent, BlendFactor, BlendOperation, BlendState};

/// Blend mode of a renderable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Standard "over" compositing.
    #[default]
    Normal,
    /// Additive blending, for glows and particles.
    Add,
    /// Multiply source and destination.
    Multiply,
    /// Inverse multiply of the inverted colors.
    Screen,
    /// No blending, the source replaces the destination.
    None,
    /// [`BlendMode::Normal`] for non-premultiplied sources.
    NormalNpm,
    /// [`BlendMode::Add`] for non-premultiplied sources.
    AddNpm,
    /// [`BlendMode::Screen`] for non-premultiplied sources.
    ScreenNpm,
    SrcIn,
    SrcOut,
    SrcAtop,
    DstOver,
    DstIn,
    /// Also known as "erase".
    DstOut,
    DstAtop,
    Subtract,
    Xor,
}

/// Remap a requested blend mode for a texture's alpha encoding.
///
/// Non-premultiplied textures trade `Normal`, `Add` and `Screen` for their
/// `*Npm` counterparts; premultiplied textures map the `*Npm` variants back.
/// Every other mode passes through unchanged.
pub fn premultiply_blend_mode(premultiplied: bool, mode: BlendMode) -> BlendMode {
    match (premultiplied, mode) {
        (false, BlendMode::Normal) => BlendMode::NormalNpm,
        (false, BlendMode::Add) => BlendMode::AddNpm,
        (false, BlendMode::Screen) => BlendMode::ScreenNpm,
        (true, BlendMode::NormalNpm) => BlendMode::Normal,
        (true, BlendMode::AddNpm) => BlendMode::Add,
        (true, BlendMode::ScreenNpm) => BlendMode::Screen,
        (_, mode) => mode,
    }
}

const fn component(src_factor: BlendFactor, dst_factor: BlendFactor) -> BlendComponent {
    BlendComponent {
        src_factor,
        dst_factor,
        operation: BlendOperation::Add,
    }
}

const fn uniform(src: BlendFactor, dst: BlendFactor) -> BlendState {
    BlendState {
        color: component(src, dst),
        alpha: component(src, dst),
    }
}

const fn separate(
    src: BlendFactor,
    dst: BlendFactor,
    src_alpha: BlendFactor,
    dst_alpha: BlendFactor,
) -> BlendState {
    BlendState {
        color: component(src, dst),
        alpha: component(src_alpha, dst_alpha),
    }
}

impl BlendMode {
    /// Convert to a wgpu blend state. `None` disables blending.
    pub fn to_blend_state(self) -> Option<BlendState> {
        use BlendFactor::*;

        let state = match self {
            BlendMode::Normal => uniform(One, OneMinusSrcAlpha),
            BlendMode::Add => uniform(One, One),
            BlendMode::Multiply => separate(Dst, OneMinusSrcAlpha, One, OneMinusSrcAlpha),
            BlendMode::Screen => separate(One, OneMinusSrc, One, OneMinusSrcAlpha),
            BlendMode::None => return None,
            BlendMode::NormalNpm => separate(SrcAlpha, OneMinusSrcAlpha, One, OneMinusSrcAlpha),
            BlendMode::AddNpm => separate(SrcAlpha, One, One, One),
            BlendMode::ScreenNpm => separate(SrcAlpha, OneMinusSrc, One, OneMinusSrcAlpha),
            BlendMode::SrcIn => uniform(DstAlpha, Zero),
            BlendMode::SrcOut => uniform(OneMinusDstAlpha, Zero),
            BlendMode::SrcAtop => uniform(DstAlpha, OneMinusSrcAlpha),
            BlendMode::DstOver => uniform(OneMinusDstAlpha, One),
            BlendMode::DstIn => uniform(Zero, SrcAlpha),
            BlendMode::DstOut => uniform(Zero, OneMinusSrcAlpha),
            BlendMode::DstAtop => uniform(OneMinusDstAlpha, SrcAlpha),
            BlendMode::Xor => uniform(OneMinusDstAlpha, OneMinusSrcAlpha),
            BlendMode::Subtract => BlendState {
                color: BlendComponent {
                    src_factor: One,
                    dst_factor: One,
                    operation: BlendOperation::ReverseSubtract,
                },
                alpha: component(One, One),
            },
        };

        Some(state)
    }

    /// Create a color target state with this blend mode.
    pub fn to_color_target_state(self, format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
        wgpu::ColorTargetState {
            format,
            blend: self.to_blend_state(),
            write_mask: wgpu::ColorWrites::ALL,
        }
    }
}

impl From<BlendMode> for Option<BlendState> {
    fn from(mode: BlendMode) -> Self {
        mode.to_blend_state()
    }
}
