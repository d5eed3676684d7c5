//! Error types for the conversion pipeline.

use std::path::{Path, PathBuf};

use thiserror::Error;

use reelport_models::TransformError;

/// Result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;

/// Errors that can occur during a portrait conversion.
///
/// This is a closed taxonomy: failures from the underlying tools are mapped
/// into one of these kinds at the boundary and never leak as raw process or
/// I/O errors.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("source not readable: {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("decode failed: {0}")]
    DecodeFailure(String),

    #[error("invalid target resolution {width}x{height}: both dimensions must be positive")]
    InvalidTargetResolution { width: u32, height: u32 },

    #[error("crop window collapsed (new_width={new_width}, x1={x1}, x2={x2})")]
    DegenerateCrop { new_width: i64, x1: i64, x2: i64 },

    #[error("encode failed: {message}")]
    EncodeFailure {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("conversion cancelled")]
    Cancelled,
}

impl ConversionError {
    /// Create a source-unreadable error.
    pub fn source_unreadable(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Create a decode failure error.
    pub fn decode_failure(message: impl Into<String>) -> Self {
        Self::DecodeFailure(message.into())
    }

    /// Create an encode failure error.
    pub fn encode_failure(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::EncodeFailure {
            message: message.into(),
            stderr,
            exit_code,
        }
    }
}

impl From<TransformError> for ConversionError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::InvalidTargetResolution { width, height } => {
                Self::InvalidTargetResolution { width, height }
            }
            TransformError::DegenerateCrop { new_width, x1, x2 } => {
                Self::DegenerateCrop { new_width, x1, x2 }
            }
        }
    }
}
