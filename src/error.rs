use thiserror::Error;

/// Errors surfaced by readers, writers and codecs.
///
/// Nothing is retried internally: backend failures are wrapped as [`OmError::Io`]
/// and bubble up unchanged. Init routines validate their arguments up front and
/// fail with [`OmError::InvalidArgument`] before any I/O happens.
#[derive(Debug, Error)]
pub enum OmError {
    #[error("invalid compression type {0}")]
    InvalidCompressionType(u8),

    #[error("invalid data type {0}")]
    InvalidDataType(u8),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("corrupted data with potential out-of-bound read")]
    OutOfBoundRead,

    #[error("not an OM file")]
    NotAnOmFile,

    #[error("corrupted data: deflated size does not match (expected {expected}, got {actual})")]
    DeflatedSizeMismatch { expected: u64, actual: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type OmResult<T> = Result<T, OmError>;
