//! Spritebatch Core
//!
//! Shared utilities for the spritebatch crates: logging setup, profiling
//! scopes and hash maps.

pub mod alloc;
pub mod logging;
pub mod profiling;
