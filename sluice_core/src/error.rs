//! Unified error handling for sluice.
//!
//! This module provides a centralized error type for the crate's lifecycle
//! operations (construction, shared-memory create/open/destroy). Transient
//! conditions — a full channel, an empty channel, an expired wait — are
//! deliberately *not* represented here; those are expected outcomes of
//! concurrent use and are reported through the small per-operation enums in
//! [`crate::channel`].

use thiserror::Error;

/// Main error type for sluice lifecycle operations.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Shared-memory mapping or allocation errors
    #[error("Memory error: {0}")]
    Memory(String),

    /// Invalid input/argument errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Already exists errors (for exclusive-create operations)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Resource not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Permission/Access errors
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Convenience result type for sluice operations.
pub type SluiceResult<T> = Result<T, SluiceError>;

impl SluiceError {
    /// Create a memory error with a formatted message.
    pub fn memory(msg: impl Into<String>) -> Self {
        SluiceError::Memory(msg.into())
    }

    /// Create an invalid input error with a formatted message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        SluiceError::InvalidInput(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let err = SluiceError::memory("mmap failed");
        assert_eq!(err.to_string(), "Memory error: mmap failed");

        let err = SluiceError::NotFound("segment 'seg1'".to_string());
        assert!(err.to_string().contains("seg1"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SluiceError = io.into();
        assert!(matches!(err, SluiceError::Io(_)));
    }
}
