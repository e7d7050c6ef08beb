//! GRIB2 decoding (WMO FM 92 GRIB Edition 2).
//!
//! Files are indexed with the `grib` crate into [`MessageHeader`] records
//! carrying the ecCodes-style keys used for filtering (`shortName`,
//! `typeOfLevel`, `level`, `stepType`, `stepRange`, ...). Only matching
//! messages are unpacked into [`GribField`]s, which are then assembled into
//! a labeled [`dataset::Dataset`] laid out the way cfgrib lays out a
//! filtered open.

pub mod build;
pub mod decoder;
pub mod error;
pub mod field;
pub mod filter;
pub mod reader;
pub mod tables;

pub use build::{fields_to_dataset, select_to_dataset};
pub use decoder::{CacheStats, GribCrateDecoder, GribDecoder};
pub use error::{Grib2Error, Grib2Result};
pub use field::{GribField, HorizontalGrid, IndexedMessage, MessageHeader, MessagePosition, StepType};
pub use filter::{FilterByKeys, FilterValue};
pub use reader::{index_messages, read_fields, read_fields_from_bytes, read_messages};
