//! Labeled multidimensional arrays.
//!
//! A small subset of the labeled-array model used by forecast tooling:
//! named dimensions, coordinate variables, attributes, and the alignment
//! operations needed to assemble one forecast sample from many decoded
//! fields.
//!
//! - [`Values`]: typed n-d storage (`f32`, `f64`, `i64`, datetimes, timedeltas)
//! - [`Variable`]: values plus dimension names and attributes
//! - [`DataArray`]: a named variable with its coordinates
//! - [`Dataset`]: data variables sharing a coordinate system

pub mod array;
pub mod attrs;
pub mod dataset;
pub mod error;
pub mod values;
pub mod variable;

pub use array::DataArray;
pub use attrs::{AttrValue, Attrs};
pub use dataset::Dataset;
pub use error::{DatasetError, Result};
pub use values::{Element, Label, ValueKind, Values};
pub use variable::Variable;
