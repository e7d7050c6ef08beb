//! Error types for labeled array operations.

use thiserror::Error;

/// Errors raised by shape and label bookkeeping.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("Variable not found: {0}")]
    VariableNotFound(String),

    #[error("Coordinate not found: {0}")]
    CoordinateNotFound(String),

    #[error("Dimension not found: {0}")]
    DimensionNotFound(String),

    #[error("Dimension already exists: {0}")]
    DimensionExists(String),

    #[error("Shape mismatch for '{name}': {reason}")]
    ShapeMismatch { name: String, reason: String },

    #[error("Conflicting sizes for dimension '{dim}': {left} vs {right}")]
    SizeConflict { dim: String, left: usize, right: usize },

    #[error("Label {label} not found along dimension '{dim}'")]
    LabelNotFound { dim: String, label: String },

    #[error("Type mismatch for '{name}': {left:?} vs {right:?}")]
    TypeMismatch {
        name: String,
        left: crate::ValueKind,
        right: crate::ValueKind,
    },

    #[error("Cannot merge '{name}': dimensions differ ({left:?} vs {right:?})")]
    DimensionOrderMismatch {
        name: String,
        left: Vec<String>,
        right: Vec<String>,
    },
}

/// Result type for labeled array operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
