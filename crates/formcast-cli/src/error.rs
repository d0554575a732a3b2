//! Error types for formcast-cli

use std::path::PathBuf;
use std::process::ExitCode;

use formcast::error::{EncodingError, PredictionError, RecordError};
use formcast::FormcastError;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Not a file (e.g., directory)
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// Unreadable CSV, JSON or model artifact
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad configuration or input record
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Input could not be turned into a feature vector
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    /// The model could not produce a prediction
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    /// Server could not start or stopped with an error
    #[error("Server error: {0}")]
    Server(String),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound(_) | Self::NotAFile(_) => ExitCode::from(3),
            Self::InvalidFormat(_) => ExitCode::from(4),
            Self::ValidationFailed(_) => ExitCode::from(5),
            Self::EncodingFailed(_) => ExitCode::from(6),
            Self::Io(_) => ExitCode::from(7),
            Self::PredictionFailed(_) => ExitCode::from(8),
            Self::Server(_) => ExitCode::from(1),
        }
    }
}

impl From<FormcastError> for CliError {
    fn from(e: FormcastError) -> Self {
        match e {
            FormcastError::Io(io) => Self::Io(io),
            FormcastError::Csv(_)
            | FormcastError::Json(_)
            | FormcastError::Bincode(_)
            | FormcastError::Format(_)
            | FormcastError::Schema(_) => Self::InvalidFormat(e.to_string()),
            FormcastError::Config(_) | FormcastError::Record(_) => {
                Self::ValidationFailed(e.to_string())
            }
            FormcastError::Encoding(_) => Self::EncodingFailed(e.to_string()),
            FormcastError::Prediction(PredictionError::InvalidAlpha(_)) => {
                Self::ValidationFailed(e.to_string())
            }
            FormcastError::Prediction(_) => Self::PredictionFailed(e.to_string()),
        }
    }
}

impl From<RecordError> for CliError {
    fn from(e: RecordError) -> Self {
        FormcastError::from(e).into()
    }
}

impl From<EncodingError> for CliError {
    fn from(e: EncodingError) -> Self {
        FormcastError::from(e).into()
    }
}

impl From<PredictionError> for CliError {
    fn from(e: PredictionError) -> Self {
        FormcastError::from(e).into()
    }
}

impl From<csv::Error> for CliError {
    fn from(e: csv::Error) -> Self {
        FormcastError::from(e).into()
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        FormcastError::from(e).into()
    }
}
