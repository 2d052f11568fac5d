//! Error types for the preprocessing adapters and their estimators

use thiserror::Error;

/// Result type alias for preprocessing operations
pub type Result<T> = std::result::Result<T, PrepError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum PrepError {
    /// A method / strategy name did not match the adapter's catalogue
    #[error("Invalid configuration for {adapter}: unrecognized method '{name}'")]
    InvalidConfiguration { adapter: &'static str, name: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    /// A required input is missing or malformed for the selected method
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{adapter} is not fitted")]
    NotFitted { adapter: &'static str },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Failure inside one step of a [`crate::preprocessing::Pipeline`]
    #[error("Pipeline step {index} ({adapter}) failed: {source}")]
    Step {
        index: usize,
        adapter: &'static str,
        #[source]
        source: Box<PrepError>,
    },
}

impl PrepError {
    /// Shorthand for a column-count mismatch between fit and transform
    pub(crate) fn feature_count(expected: usize, actual: usize) -> Self {
        PrepError::ShapeError {
            expected: format!("{} features", expected),
            actual: format!("{} features", actual),
        }
    }
}

impl PrepError {
    pub(crate) fn invalid_parameter(name: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        PrepError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PrepError {
    fn from(err: ndarray::ShapeError) -> Self {
        PrepError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
