//! Forecast ingestion engine.
//!
//! Normalizes per-variable GRIB2 forecast files, keyed by initialization
//! time, ensemble member and forecast hour, into sample datasets with one
//! schema across variables and files.
//!
//! # Architecture
//!
//! - [`VariableRegistry`]: per-family table of decode filters and the
//!   file suffixes each variable lives in
//! - [`storage::LocalFileResolver`]: sample key + suffix → local file, or
//!   nothing when the file is unavailable
//! - [`GribForecastSource::extract`]: one variable from one file, with
//!   level selection, accumulation windows, member and forecast-hour axes
//! - [`GribForecastSource::open_sample_dataset`]: every variable of one
//!   sample, complete or empty
//! - [`GribForecastSource::open_grib`]: a whole file at once

pub mod accumulation;
mod assemble;
pub mod config;
pub mod error;
pub mod extract;
pub mod family;
pub mod full_file;
pub mod registry;
mod slices;
pub mod source;
pub mod static_cache;
mod transform;

// Re-exports
pub use accumulation::AccumulationSpec;
pub use config::{Slices, SourceConfig};
pub use error::{IngestionError, Result};
pub use extract::{AbsentReason, Extracted};
pub use family::{DefaultPathBuilder, SourceCapabilities, SourceFamily, TemplatePathBuilder};
pub use full_file::OpenGribOptions;
pub use registry::{VariableRegistry, VariableSpec};
pub use source::{GribForecastSource, NEAREST_LEVEL_TOLERANCE};
pub use static_cache::StaticVarCache;
