//! Texture handles as seen by the batcher.
//!
//! A [`Texture`] is owned by the scene graph and shared with the batcher and
//! the backend through [`TextureHandle`]. Besides its identity and alpha mode
//! it carries two transient fields written only while building texture
//! arrays: the batch epoch that last claimed it and the texture unit it was
//! last assigned to.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Shared handle to a texture.
pub type TextureHandle = Arc<Texture>;

/// Stable, process-unique texture identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric id.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// How a texture's color channels relate to its alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaMode {
    /// Color is stored straight, not multiplied by alpha.
    NoPremultipliedAlpha,
    /// Color is premultiplied while uploading.
    #[default]
    Unpack,
    /// Source data is already premultiplied.
    PremultipliedAlpha,
}

impl AlphaMode {
    /// Whether sampled colors arrive premultiplied by alpha.
    pub fn is_premultiplied(self) -> bool {
        !matches!(self, AlphaMode::NoPremultipliedAlpha)
    }
}

/// Epoch shared by every batcher in the process.
///
/// Each texture-array building pass claims a fresh value, so a texture's
/// `batch_epoch` only matches the pass that most recently claimed it and no
/// per-pass reset of the textures is needed.
static BATCH_EPOCH: AtomicU64 = AtomicU64::new(0);

/// Claim a fresh batch epoch.
pub(crate) fn next_batch_epoch() -> u64 {
    BATCH_EPOCH.fetch_add(1, Ordering::Relaxed) + 1
}

const NO_LOCATION: u32 = u32::MAX;

/// A texture that items reference and the batcher assigns to texture units.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    label: Option<String>,
    width: u32,
    height: u32,
    alpha_mode: AlphaMode,
    valid: AtomicBool,
    batch_epoch: AtomicU64,
    batch_location: AtomicU32,
}

impl Texture {
    /// Create a loaded texture with the default alpha mode.
    pub fn new(width: u32, height: u32) -> TextureHandle {
        Self::with_alpha_mode(width, height, AlphaMode::default())
    }

    /// Create a loaded texture with an explicit alpha mode.
    pub fn with_alpha_mode(width: u32, height: u32, alpha_mode: AlphaMode) -> TextureHandle {
        Arc::new(Self::build(None, width, height, alpha_mode, true))
    }

    /// Create a labelled, loaded texture.
    pub fn labelled(label: impl Into<String>, width: u32, height: u32) -> TextureHandle {
        Arc::new(Self::build(
            Some(label.into()),
            width,
            height,
            AlphaMode::default(),
            true,
        ))
    }

    /// Create a texture whose data has not arrived yet. Items using it are
    /// skipped until [`Texture::mark_loaded`] is called.
    pub fn pending(width: u32, height: u32) -> TextureHandle {
        Arc::new(Self::build(None, width, height, AlphaMode::default(), false))
    }

    fn build(
        label: Option<String>,
        width: u32,
        height: u32,
        alpha_mode: AlphaMode,
        valid: bool,
    ) -> Self {
        Self {
            id: TextureId::next(),
            label,
            width,
            height,
            alpha_mode,
            valid: AtomicBool::new(valid && width > 0 && height > 0),
            batch_epoch: AtomicU64::new(0),
            batch_location: AtomicU32::new(NO_LOCATION),
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha_mode
    }

    /// Whether the texture is loaded and not destroyed.
    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Relaxed)
    }

    /// Mark the texture's data as available.
    pub fn mark_loaded(&self) {
        if self.width > 0 && self.height > 0 {
            self.valid.store(true, Ordering::Relaxed);
        }
    }

    /// Invalidate the texture. Items referencing it are no longer rendered.
    pub fn destroy(&self) {
        self.valid.store(false, Ordering::Relaxed);
    }

    pub(crate) fn batch_epoch(&self) -> u64 {
        self.batch_epoch.load(Ordering::Relaxed)
    }

    pub(crate) fn set_batch_epoch(&self, epoch: u64) {
        self.batch_epoch.store(epoch, Ordering::Relaxed);
    }

    /// Texture unit this texture was last assigned to by a batcher.
    pub fn batch_location(&self) -> Option<u32> {
        match self.batch_location.load(Ordering::Relaxed) {
            NO_LOCATION => None,
            unit => Some(unit),
        }
    }

    pub(crate) fn set_batch_location(&self, unit: u32) {
        self.batch_location.store(unit, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let a = Texture::new(4, 4);
        let b = Texture::new(4, 4);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_pending_texture_becomes_valid() {
        let tex = Texture::pending(8, 8);
        assert!(!tex.is_valid());
        tex.mark_loaded();
        assert!(tex.is_valid());
        tex.destroy();
        assert!(!tex.is_valid());
    }

    #[test]
    fn test_zero_sized_texture_is_invalid() {
        let tex = Texture::new(0, 16);
        assert!(!tex.is_valid());
        tex.mark_loaded();
        assert!(!tex.is_valid());
    }

    #[test]
    fn test_batch_location_starts_unset() {
        let tex = Texture::new(1, 1);
        assert_eq!(tex.batch_location(), None);
        tex.set_batch_location(3);
        assert_eq!(tex.batch_location(), Some(3));
    }

    #[test]
    fn test_epochs_are_strictly_increasing() {
        let a = next_batch_epoch();
        let b = next_batch_epoch();
        assert!(b > a);
    }

    #[test]
    fn test_alpha_mode_premultiplied() {
        assert!(!AlphaMode::NoPremultipliedAlpha.is_premultiplied());
        assert!(AlphaMode::Unpack.is_premultiplied());
        assert!(AlphaMode::PremultipliedAlpha.is_premultiplied());
    }
}
