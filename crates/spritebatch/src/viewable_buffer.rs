//! A byte buffer with typed views over the same memory.

use bytemuck::Pod;

/// Raw buffer exposing several numeric views over one allocation.
///
/// Storage is a slice of `u32` words so every view up to 32 bits is
/// correctly aligned. Heterogeneous per-vertex attributes are interleaved by
/// writing through the `u32` view, with floats stored as their bit patterns;
/// the other views read the same bytes back.
#[derive(Debug, Clone)]
pub struct ViewableBuffer {
    words: Box<[u32]>,
}

impl ViewableBuffer {
    /// Allocate a zeroed buffer of at least `byte_len` bytes, rounded up to
    /// whole 32-bit words.
    pub fn new(byte_len: usize) -> Self {
        Self {
            words: vec![0u32; byte_len.div_ceil(4)].into_boxed_slice(),
        }
    }

    /// Size in bytes.
    pub fn byte_len(&self) -> usize {
        self.words.len() * 4
    }

    /// Size in 32-bit words.
    pub fn word_len(&self) -> usize {
        self.words.len()
    }

    /// Backing bytes, for upload.
    pub fn raw_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// View the buffer as any plain type of at most 32-bit alignment.
    pub fn view<T: Pod>(&self) -> &[T] {
        bytemuck::cast_slice(&self.words)
    }

    /// Mutable view as any plain type of at most 32-bit alignment.
    pub fn view_mut<T: Pod>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(&mut self.words)
    }

    pub fn uint8_view(&self) -> &[u8] {
        self.view()
    }

    pub fn int8_view(&self) -> &[i8] {
        self.view()
    }

    pub fn uint16_view(&self) -> &[u16] {
        self.view()
    }

    pub fn int16_view(&self) -> &[i16] {
        self.view()
    }

    pub fn uint32_view(&self) -> &[u32] {
        &self.words
    }

    pub fn int32_view(&self) -> &[i32] {
        self.view()
    }

    pub fn float32_view(&self) -> &[f32] {
        self.view()
    }

    /// Mutable word view used by the packers.
    pub fn uint32_view_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }
}
