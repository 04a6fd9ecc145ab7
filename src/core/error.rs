//! Error types for the SVM handle layer

use crate::core::types::Kind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid input shape: {0}")]
    InvalidShape(String),

    #[error("invalid {kind} handle")]
    InvalidHandle { kind: Kind },

    /// Handle that names no live instance of any kind
    #[error("invalid handle")]
    UnknownHandle,

    /// Message reported by the solver's parameter check, kept verbatim.
    #[error("{0}")]
    ParameterValidation(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Allocation failed: {0}")]
    Allocation(String),

    #[error("Optimization failed: {0}")]
    OptimizationError(String),

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, SVMError>;
