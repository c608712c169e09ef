//! Deriving how many texture units a batch may use.
//!
//! The unit count is bounded by the backend's sampler limit, the configured
//! recommendation, and by how long an `if`/`else` chain the local shader
//! compiler accepts. The last bound is found by compiling probe shaders,
//! halving the candidate after each rejection.

use std::fmt::Write;

use crate::backend::BatchBackend;
use crate::config::BatchConfig;
use crate::error::{BatchError, BatchResult};

/// Fragment probe compiled to test branch limits.
pub const PROBE_TEMPLATE: &str = include_str!("../shaders/probe_fragment.wgsl");

/// An empty `if`/`else` chain with `max_ifs` arms.
pub fn generate_if_test_src(max_ifs: u32) -> String {
    let mut src = String::new();
    for i in 0..max_ifs {
        if i > 0 {
            src.push_str("\n    else ");
        }
        if i + 1 < max_ifs {
            let _ = write!(src, "if (test == {i}.0) {{}}");
        } else {
            src.push_str("{}");
        }
    }
    src
}

/// Largest arm count, at most `max_ifs`, whose probe shader compiles.
///
/// Never returns less than one: a single unit needs no branching at all.
pub fn probe_max_if_statements(max_ifs: u32, backend: &dyn BatchBackend) -> BatchResult<u32> {
    if max_ifs == 0 {
        return Err(BatchError::InvalidTextureCount);
    }

    let mut candidate = max_ifs;
    loop {
        let source = PROBE_TEMPLATE.replace("%forloop%", &generate_if_test_src(candidate));
        if backend.compile_probe(&source) {
            return Ok(candidate);
        }

        let next = candidate / 2;
        if next == 0 {
            tracing::warn!("probe shader with a single branch failed to compile, using 1 texture unit");
            return Ok(1);
        }

        tracing::warn!(
            rejected = candidate,
            retry = next,
            "shader compiler rejected branch count, halving"
        );
        candidate = next;
    }
}

/// Texture units a batch renderer should use with `backend`.
pub fn resolve_max_textures(config: &BatchConfig, backend: &dyn BatchBackend) -> BatchResult<u32> {
    if config.legacy {
        return Ok(1);
    }

    let hardware = backend.max_texture_units();
    let candidate = hardware.min(config.max_textures);
    if candidate == 0 {
        return Err(BatchError::InvalidTextureCount);
    }

    let max_textures = probe_max_if_statements(candidate, backend)?;
    tracing::info!(
        hardware,
        recommended = config.max_textures,
        max_textures,
        "resolved batch texture units"
    );
    Ok(max_textures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBatchBackend;

    #[test]
    fn test_if_test_src_arms() {
        assert_eq!(generate_if_test_src(1), "{}");
        let src = generate_if_test_src(3);
        assert_eq!(src.matches("if (").count(), 2);
        assert!(src.ends_with("else {}"));
    }

    #[test]
    fn test_probe_accepts_when_compiler_allows() {
        let backend = MockBatchBackend::new();
        assert_eq!(probe_max_if_statements(16, &backend), Ok(16));
    }

    #[test]
    fn test_probe_halves_until_it_compiles() {
        let backend = MockBatchBackend::new().with_branch_limit(5);
        assert_eq!(probe_max_if_statements(16, &backend), Ok(4));
        assert_eq!(backend.count_probes(), 3);
    }

    #[test]
    fn test_probe_never_returns_zero() {
        let backend = MockBatchBackend::new().with_branch_limit(0);
        assert_eq!(probe_max_if_statements(4, &backend), Ok(1));
    }

    #[test]
    fn test_probe_rejects_zero() {
        let backend = MockBatchBackend::new();
        assert_eq!(
            probe_max_if_statements(0, &backend),
            Err(BatchError::InvalidTextureCount)
        );
    }

    #[test]
    fn test_resolve_respects_hardware_and_config() {
        let backend = MockBatchBackend::new().with_max_texture_units(8);
        let config = BatchConfig::default().with_max_textures(16);
        assert_eq!(resolve_max_textures(&config, &backend), Ok(8));

        let config = BatchConfig::default().with_max_textures(4);
        assert_eq!(resolve_max_textures(&config, &backend), Ok(4));

        let config = BatchConfig::default().with_legacy(true);
        assert_eq!(resolve_max_textures(&config, &backend), Ok(1));
    }

    #[test]
    fn test_resolve_rejects_backend_without_units() {
        let backend = MockBatchBackend::new().with_max_texture_units(0);
        assert_eq!(
            resolve_max_textures(&BatchConfig::default(), &backend),
            Err(BatchError::InvalidTextureCount)
        );
    }
}
