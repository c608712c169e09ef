//! Texture-to-unit assignment for one group of draw calls.

use crate::texture::{TextureHandle, TextureId};

/// The distinct textures used by a run of draw calls and the texture unit
/// each one is bound to.
///
/// Arrays live in a pool owned by the renderer and are cleared, not
/// reallocated, between flushes. The texture handles are released once the
/// array's draw calls have been issued; the texture ids and units stay
/// readable until the next flush.
#[derive(Debug, Default)]
pub struct BatchTextureArray {
    elements: Vec<TextureHandle>,
    texture_ids: Vec<TextureId>,
    ids: Vec<u32>,
}

impl BatchTextureArray {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
            texture_ids: Vec::with_capacity(capacity),
            ids: Vec::with_capacity(capacity),
        }
    }

    /// Textures in the order they were first referenced. Empty after the
    /// array has been drawn.
    pub fn elements(&self) -> &[TextureHandle] {
        &self.elements
    }

    /// Ids of the array's textures in the order they were first referenced.
    pub fn texture_ids(&self) -> &[TextureId] {
        &self.texture_ids
    }

    /// Texture unit of each texture, parallel to
    /// [`texture_ids`](Self::texture_ids).
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn count(&self) -> usize {
        self.texture_ids.len()
    }

    pub(crate) fn push(&mut self, texture: TextureHandle) {
        self.texture_ids.push(texture.id());
        self.elements.push(texture);
    }

    /// Drop the texture handles, keeping ids and units.
    pub(crate) fn release_textures(&mut self) {
        self.elements.clear();
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.texture_ids.clear();
        self.ids.clear();
    }

    /// Give every element a texture unit.
    ///
    /// `bound` is the renderer's snapshot of the backend's unit table and is
    /// updated in place. An element already resident at its previous unit
    /// keeps it. Otherwise the element takes the lowest unit not held by
    /// another member of this array (a member is recognized by carrying the
    /// current `epoch` and a `batch_location` equal to that unit).
    pub(crate) fn assign_units(&mut self, bound: &mut [Option<TextureHandle>], epoch: u64) {
        let max = bound.len() as u32;
        let mut next = 0u32;
        self.ids.clear();

        for texture in &self.elements {
            if let Some(location) = texture.batch_location()
                && location < max
                && bound[location as usize]
                    .as_ref()
                    .is_some_and(|resident| resident.id() == texture.id())
            {
                self.ids.push(location);
                continue;
            }

            while next < max {
                let taken = bound[next as usize].as_ref().is_some_and(|resident| {
                    resident.batch_epoch() == epoch && resident.batch_location() == Some(next)
                });
                if taken {
                    next += 1;
                    continue;
                }

                self.ids.push(next);
                texture.set_batch_location(next);
                bound[next as usize] = Some(texture.clone());
                break;
            }
        }

        debug_assert_eq!(
            self.ids.len(),
            self.elements.len(),
            "texture array holds more textures than there are units"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::texture::{Texture, next_batch_epoch};

    fn claim(array: &mut BatchTextureArray, texture: &TextureHandle, epoch: u64) {
        texture.set_batch_epoch(epoch);
        array.push(texture.clone());
    }

    #[test]
    fn test_fills_free_units_in_order() {
        let epoch = next_batch_epoch();
        let (a, b, c) = (Texture::new(1, 1), Texture::new(1, 1), Texture::new(1, 1));
        let mut array = BatchTextureArray::with_capacity(4);
        for texture in [&a, &b, &c] {
            claim(&mut array, texture, epoch);
        }

        let mut bound = vec![None; 4];
        array.assign_units(&mut bound, epoch);

        assert_eq!(array.ids(), &[0, 1, 2]);
        assert_eq!(c.batch_location(), Some(2));
        assert_eq!(bound[1].as_ref().map(|t| t.id()), Some(b.id()));
        assert!(bound[3].is_none());
    }

    #[test]
    fn test_resident_texture_keeps_its_unit() {
        let (a, b) = (Texture::new(1, 1), Texture::new(1, 1));
        b.set_batch_location(2);
        let mut bound = vec![None, None, Some(b.clone()), None];

        let epoch = next_batch_epoch();
        let mut array = BatchTextureArray::with_capacity(4);
        claim(&mut array, &a, epoch);
        claim(&mut array, &b, epoch);
        array.assign_units(&mut bound, epoch);

        assert_eq!(array.ids(), &[0, 2]);
    }

    #[test]
    fn test_later_resident_member_is_not_evicted() {
        let (a, c) = (Texture::new(1, 1), Texture::new(1, 1));
        c.set_batch_location(0);
        let mut bound = vec![Some(c.clone()), None];

        let epoch = next_batch_epoch();
        let mut array = BatchTextureArray::with_capacity(2);
        claim(&mut array, &a, epoch);
        claim(&mut array, &c, epoch);
        array.assign_units(&mut bound, epoch);

        // `a` must skip unit 0 because `c`, also in this array, already lives there.
        assert_eq!(array.ids(), &[1, 0]);
    }

    #[test]
    fn test_stale_location_is_reassigned() {
        let (a, other) = (Texture::new(1, 1), Texture::new(1, 1));
        a.set_batch_location(1);
        let mut bound = vec![None, Some(other.clone())];

        let epoch = next_batch_epoch();
        let mut array = BatchTextureArray::with_capacity(2);
        claim(&mut array, &a, epoch);
        array.assign_units(&mut bound, epoch);

        assert_eq!(array.ids(), &[0]);
        assert_eq!(a.batch_location(), Some(0));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut array = BatchTextureArray::with_capacity(8);
        array.push(Texture::new(1, 1));
        array.clear();
        assert_eq!(array.count(), 0);
        assert!(array.elements.capacity() >= 8);
    }

    #[test]
    fn test_release_keeps_ids_and_units() {
        let texture = Texture::new(1, 1);
        let epoch = next_batch_epoch();
        let mut array = BatchTextureArray::with_capacity(2);
        claim(&mut array, &texture, epoch);
        array.assign_units(&mut vec![None; 2], epoch);
        assert_eq!(Arc::strong_count(&texture), 2);

        array.release_textures();
        assert_eq!(Arc::strong_count(&texture), 1);
        assert!(array.elements().is_empty());
        assert_eq!(array.texture_ids(), &[texture.id()]);
        assert_eq!(array.ids(), &[0]);
        assert_eq!(array.count(), 1);
    }
}
