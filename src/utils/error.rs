//! Error types and handling
//!
//! Common error types used across the capture core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::CaptureError;
use crate::encoder::EncoderError;
use crate::history::HistoryError;
use crate::recorder::RecorderError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Encoder(#[from] EncoderError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Error response for frontends
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let code = match &error {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Capture(CaptureError::DeviceUnavailable(_)) => "DEVICE_UNAVAILABLE",
            AppError::Capture(_) => "CAPTURE_ERROR",
            AppError::Encoder(EncoderError::NoSupportedFormat) => "NO_SUPPORTED_FORMAT",
            AppError::Encoder(_) => "ENCODER_ERROR",
            AppError::Recorder(RecorderError::NoActiveStream) => "NO_ACTIVE_STREAM",
            AppError::Recorder(_) => "RECORDER_ERROR",
            AppError::History(HistoryError::NothingSelected) => "NOTHING_SELECTED",
            AppError::History(_) => "HISTORY_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
