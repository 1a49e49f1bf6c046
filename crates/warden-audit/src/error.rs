// error.rs — Error types for the audit subsystem.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by sinks and the journal.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Failed to open or create a journal or sink file.
    #[error("failed to open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write to an open file.
    #[error("failed to write: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Malformed JSON on read, or an unserializable value on write.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The exported journal has been tampered with.
    #[error("integrity check failed at line {line}: expected hash {expected}, got {actual}")]
    IntegrityViolation {
        line: usize,
        expected: String,
        actual: String,
    },

    /// Sequence numbers in an exported journal are not contiguous.
    #[error("journal sequence gap at line {line}: expected seq {expected}, got {actual}")]
    SequenceGap {
        line: usize,
        expected: u64,
        actual: u64,
    },
}
