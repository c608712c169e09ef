//! Error types for the batching system.
//!
//! Errors only surface while configuring or initialising a renderer. Once a
//! renderer is running, `render` and `flush` never fail: invalid items are
//! skipped and capacity pressure is absorbed by flushing early.

use std::fmt;

/// Errors that can occur while setting up a batch renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// A texture-unit count of zero was requested.
    InvalidTextureCount,

    /// A shader template is missing a required placeholder.
    InvalidTemplate {
        /// The placeholder that was not found, e.g. `%count%`.
        placeholder: &'static str,
    },

    /// The configured batch size cannot be addressed with 16-bit indices.
    InvalidBatchSize {
        /// Requested vertex capacity.
        requested: usize,
        /// Largest vertex capacity supported.
        max: usize,
    },

    /// The backend rejected a generated shader program.
    ShaderCompilation {
        /// Backend-provided diagnostic.
        message: String,
    },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::InvalidTextureCount => {
                write!(f, "Invalid texture unit count of 0")
            }
            BatchError::InvalidTemplate { placeholder } => {
                write!(f, "Shader template must contain \"{}\"", placeholder)
            }
            BatchError::InvalidBatchSize { requested, max } => {
                write!(
                    f,
                    "Batch vertex capacity {} exceeds the 16-bit index limit of {}",
                    requested, max
                )
            }
            BatchError::ShaderCompilation { message } => {
                write!(f, "Shader compilation failed: {}", message)
            }
        }
    }
}

impl std::error::Error for BatchError {}

/// Result type alias for batching operations.
pub type BatchResult<T> = Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_error_names_placeholder() {
        let err = BatchError::InvalidTemplate {
            placeholder: "%forloop%",
        };
        assert!(err.to_string().contains("%forloop%"));
    }

    #[test]
    fn test_batch_size_error_display() {
        let err = BatchError::InvalidBatchSize {
            requested: 70000,
            max: 65536,
        };
        let display = err.to_string();
        assert!(display.contains("70000"));
        assert!(display.contains("65536"));
    }
}
