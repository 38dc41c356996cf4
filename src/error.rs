//! Error types for the file sniffer and image loader.
//!
//! Classification never fails; only reading files and materializing a
//! program image produce these errors.

use crate::types::Format;
use thiserror::Error;

/// Primary error type for the crate.
#[derive(Debug, Error)]
pub enum KcFileError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No signature or filename heuristic matched.
    #[error("Unrecognized file format")]
    UnrecognizedFormat,

    /// The format can only be played back through the tape interface.
    #[error("{format} can only be loaded through the emulated tape interface")]
    TapeOnlyFormat {
        /// Format of the file
        format: Format,
    },

    /// The container is damaged in a way that prevents extraction.
    #[error("{format}: {message}")]
    StructuralCorruption {
        /// Format of the file
        format: Format,
        /// What is broken
        message: String,
    },

    /// A fixed-offset field lies beyond the end of the data.
    #[error("Truncated data at offset {offset}: expected {expected} bytes, got {actual}")]
    TruncatedData {
        /// Offset of the field
        offset: usize,
        /// Bytes needed
        expected: usize,
        /// Bytes present
        actual: usize,
    },

    /// The format carries no load address and none was supplied.
    #[error("{format} has no load address, one must be supplied by the caller")]
    MissingLoadAddress {
        /// Format of the file
        format: Format,
    },
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, KcFileError>;

impl KcFileError {
    /// Shorthand for a structural corruption error.
    pub(crate) fn corrupt(format: Format, message: impl Into<String>) -> Self {
        KcFileError::StructuralCorruption {
            format,
            message: message.into(),
        }
    }
}
