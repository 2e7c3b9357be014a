//! Error types for sparse multiply autotuning.

use crate::core::StructuralKey;
use thiserror::Error;

/// Boxed error raised by a device backend.
pub type DeviceError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while selecting or running a sparse multiply kernel.
#[derive(Debug, Error)]
pub enum SpmmError {
    /// The operands cannot be multiplied together (caller error).
    #[error("Incompatible matrices for out = a*b: {0}")]
    InvalidUsage(String),

    /// The operation is valid but not eligible for this path.
    ///
    /// Callers are expected to fall back to a different multiply strategy.
    #[error("Not suitable for autotuned sparse multiply: {0}")]
    NotSuitable(String),

    /// No candidate kernel could be built and benchmarked for a key.
    #[error("Kernel build failed for {key}: {attempted} candidate(s) attempted{}", last_error_suffix(.last_error))]
    BuildFailed {
        key: StructuralKey,
        attempted: usize,
        last_error: Option<String>,
    },

    /// Operand storage does not match its descriptor.
    #[error("Layout error: {0}")]
    Layout(String),

    /// Device or runtime failure.
    #[error("Device error: {0}")]
    Device(#[source] DeviceError),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {e})"),
        None => " (generator produced no candidates)".to_string(),
    }
}

impl SpmmError {
    /// Wrap a backend error.
    pub fn device<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Device(Box::new(err))
    }

    /// True if the caller should silently fall back to another strategy.
    pub fn is_not_suitable(&self) -> bool {
        matches!(self, Self::NotSuitable(_))
    }

    /// True for caller programming errors.
    pub fn is_invalid_usage(&self) -> bool {
        matches!(self, Self::InvalidUsage(_))
    }
}

/// Result type for sparse multiply operations.
pub type Result<T> = std::result::Result<T, SpmmError>;
