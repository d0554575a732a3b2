//! Error types for formcast operations.
//!
//! Encoding and prediction failures are terminal for a single request only.
//! Nothing in this crate retries.

use thiserror::Error;

/// Errors raised while turning a raw record into a model-ready row.
///
/// # Examples
///
/// ```
/// use formcast::error::EncodingError;
///
/// let err = EncodingError::NonNumericColumn {
///     columns: vec!["age".to_string()],
/// };
/// assert!(err.to_string().contains("age"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodingError {
    /// One or more aligned columns could not be coerced to a finite number.
    #[error("non-numeric columns remain after alignment: {columns:?}")]
    NonNumericColumn {
        /// Offending column names, in expected-column order
        columns: Vec<String>,
    },

    /// A categorical value outside the reference category set
    /// (only raised under [`UnknownCategoryPolicy::Reject`](crate::encoder::UnknownCategoryPolicy)).
    #[error("unknown category {value:?} for field '{field}'")]
    UnknownCategory {
        /// Field name
        field: String,
        /// Normalized value that was not found
        value: String,
    },
}

/// Errors raised while validating a raw input record against a schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A feature field required by the schema was not supplied.
    #[error("missing field '{0}'")]
    MissingField(String),

    /// A field the schema does not know about was supplied.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// The target column was supplied as an input.
    #[error("target field '{0}' cannot be an input")]
    TargetSupplied(String),

    /// A numeric input lies outside the reference bounds.
    #[error("value {value} for '{field}' is outside [{min}, {max}]")]
    OutOfRange {
        /// Field name
        field: String,
        /// Submitted value
        value: f64,
        /// Lower bound (inclusive)
        min: f64,
        /// Upper bound (inclusive)
        max: f64,
    },

    /// A categorical field was given a number instead of a label.
    #[error("field '{field}' takes a category label, got the number {value}")]
    NumberForCategory {
        /// Field name
        field: String,
        /// Submitted number
        value: f64,
    },

    /// An upload contained no usable rows.
    #[error("no complete rows in input")]
    Empty,
}

/// Errors raised by the model invocation boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// The artifact failed (returned an error or panicked) during prediction.
    #[error("model invocation failed: {message}")]
    ModelInvocationFailed {
        /// Underlying failure message
        message: String,
        /// Diagnostic dump of the offending row
        vector: Vec<(String, f64)>,
    },

    /// Miscoverage level outside the open interval (0, 1).
    #[error("alpha must lie in (0, 1), got {0}")]
    InvalidAlpha(f64),

    /// The artifact does not offer the requested capability.
    #[error("model does not support {0}")]
    Unsupported(&'static str),
}

/// Failure reported by a [`Predictor`](crate::model::Predictor) implementation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct ModelFault(pub String);

impl ModelFault {
    /// Create a fault from any displayable message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Main error type for formcast operations.
#[derive(Error, Debug)]
pub enum FormcastError {
    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary artifact (de)serialization error.
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Invalid or inconsistent model artifact.
    #[error("invalid model artifact: {0}")]
    Format(String),

    /// Reference data does not match the declared schema.
    #[error("schema error: {0}")]
    Schema(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Record validation failure.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Encoding failure.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Prediction failure.
    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl FormcastError {
    /// Create a schema error for a column missing from a header row.
    #[must_use]
    pub fn missing_column(name: &str, available: &[String]) -> Self {
        Self::Schema(format!("column '{name}' not found (available: {available:?})"))
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, FormcastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_numeric_column_lists_offenders() {
        let err = EncodingError::NonNumericColumn {
            columns: vec!["age".to_string(), "flight_distance".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("flight_distance"));
    }

    #[test]
    fn test_encoding_error_is_transparent_in_umbrella() {
        let err: FormcastError = EncodingError::UnknownCategory {
            field: "class".to_string(),
            value: "First".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "unknown category \"First\" for field 'class'");
    }

    #[test]
    fn test_prediction_error_carries_message() {
        let err = PredictionError::ModelInvocationFailed {
            message: "tree not fitted".to_string(),
            vector: vec![("age".to_string(), 30.0)],
        };
        assert_eq!(err.to_string(), "model invocation failed: tree not fitted");
    }

    #[test]
    fn test_out_of_range_display() {
        let err = RecordError::OutOfRange {
            field: "age".to_string(),
            value: 120.0,
            min: 7.0,
            max: 85.0,
        };
        assert_eq!(err.to_string(), "value 120 for 'age' is outside [7, 85]");
    }

    #[test]
    fn test_missing_column_helper() {
        let err = FormcastError::missing_column("price", &["carat".to_string()]);
        assert!(matches!(err, FormcastError::Schema(_)));
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FormcastError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
