//! Error types for GRIB2 decoding.

use thiserror::Error;

/// Errors raised while reading GRIB2 files or assembling their fields.
#[derive(Error, Debug)]
pub enum Grib2Error {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid GRIB2 data: {0}")]
    InvalidFormat(String),

    #[error("Failed to unpack data: {0}")]
    Unpack(String),

    #[error("Unsupported filter key: {0}")]
    UnsupportedFilterKey(String),

    #[error("No messages match filter {0}")]
    NoMatchingMessages(String),

    #[error("Variable '{name}' is ambiguous: {reason}")]
    Ambiguous { name: String, reason: String },

    #[error("Conflicting values for coordinate '{0}'")]
    ConflictingCoordinate(String),

    #[error(transparent)]
    Dataset(#[from] dataset::DatasetError),
}

/// Result type for GRIB2 operations.
pub type Grib2Result<T> = std::result::Result<T, Grib2Error>;
