//! Error types for file resolution.

use thiserror::Error;

/// Errors raised while fetching or caching forecast files.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
