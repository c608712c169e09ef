//! Hash collections used across the spritebatch crates.

pub use ahash::AHashMap as HashMap;
