//! Error types for Metal operations.

use spmm_tune::SpmmError;
use thiserror::Error;

/// Errors that can occur during Metal operations.
#[derive(Debug, Error)]
pub enum MetalError {
    /// No Metal device available.
    #[error("No Metal device available")]
    NoDevice,

    /// Candidate source failed to compile.
    #[error("Metal shader compilation error: {0}")]
    ShaderCompile(String),

    /// Pipeline creation failed.
    #[error("Metal library error: {0}")]
    Library(String),

    /// The compiled library has no function with the requested name.
    #[error("Kernel not found: {0}")]
    KernelNotFound(String),

    #[error("Buffer creation error: {0}")]
    BufferCreation(String),

    /// Argument count or buffer size does not match.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Command buffer error: {0}")]
    CommandBuffer(String),

    /// The dispatch was rejected or failed on the device.
    #[error("Execution error: {0}")]
    Execution(String),
}

impl From<MetalError> for SpmmError {
    fn from(err: MetalError) -> Self {
        SpmmError::device(err)
    }
}

/// Result type for Metal operations.
pub type Result<T> = std::result::Result<T, MetalError>;
