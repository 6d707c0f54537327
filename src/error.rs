//! Error types for the fedeval library.

use thiserror::Error;

/// Result type for fedeval operations.
pub type Result<T> = std::result::Result<T, FedEvalError>;

/// Error types that can occur during evaluation or aggregation.
#[derive(Error, Debug)]
pub enum FedEvalError {
    /// Error during JSON parsing or serialization.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error while parsing a YAML dataset description.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Error during I/O operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid caller input: mismatched weights, empty inputs, bad configuration.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A label record line that could not be parsed.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Tensors under the same parameter name disagree in shape or type.
    /// For a tensor whose element count does not match its own shape,
    /// `expected` is that shape and `found` holds the element count.
    #[error("Shape mismatch for '{key}': expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        key: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
}
