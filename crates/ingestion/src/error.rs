//! Error types for the ingestion crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while configuring a source or assembling samples.
///
/// Missing files and variables are not errors: they surface as absent
/// results or empty samples. These variants are for configuration mistakes
/// and broken assumptions about the source format.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Unsupported forecast source: {0} (expected a name containing gefs, gfs or hrrr)")]
    UnsupportedSource(String),

    #[error(
        "{source_name}: accum_hrs['{variable}'] = {hours} is greater than the {limit_name} = {limit}"
    )]
    AccumulationTooLong {
        source_name: String,
        variable: String,
        hours: u32,
        limit_name: &'static str,
        limit: u32,
    },

    #[error("{source_name}: unknown variable '{variable}'")]
    UnknownVariable {
        source_name: String,
        variable: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("valid_time mismatch at {dims}: file has {stored}, t0 + lead_time is {expected}")]
    ValidTimeMismatch {
        dims: String,
        stored: DateTime<Utc>,
        expected: DateTime<Utc>,
    },

    #[error("Dataset error: {0}")]
    Dataset(#[from] dataset::DatasetError),

    #[error("GRIB2 error: {0}")]
    Grib2(#[from] grib2_parser::Grib2Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;
