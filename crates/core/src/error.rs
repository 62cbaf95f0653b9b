//! Error types for the cropfit-core library.
//!
//! Geometry errors are raised before any computation uses a bad input;
//! adapter errors (decode, encode, filesystem) are reported as-is and the
//! caller decides whether to stop the batch.

use thiserror::Error;

/// Errors that can occur within the cropfit-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// A width or height was zero, negative, or not a finite number.
    #[error("Invalid dimensions: {width}x{height} (both sides must be positive)")]
    InvalidDimensions { width: f64, height: f64 },

    /// Border percentage outside `[0, 50)`.
    #[error("Invalid border: {0}% (must be at least 0 and below 50)")]
    InvalidBorder(f64),

    /// Aspect ratio could not be parsed or has a non-positive side.
    #[error("Invalid aspect ratio: {0}")]
    InvalidRatio(String),

    /// Decoding an input image failed.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Encoding or writing an output image failed.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The file extension is accepted for selection but cannot be decoded.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// No usable images were selected.
    #[error("No supported images selected")]
    NoImages,

    /// An export was requested before choosing an output directory.
    #[error("Output directory is not set")]
    NoOutputDir,

    /// Another operation is still in flight.
    #[error("Busy: {0} is still in progress")]
    Busy(String),

    /// Navigation past either end of the file list.
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Configuration-related errors (invalid environment values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates an invalid-dimensions error for the given sides.
    pub fn dimensions(width: f64, height: f64) -> Self {
        Self::InvalidDimensions { width, height }
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Creates an encode error with the given message.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Creates a navigation error with the given message.
    pub fn navigation(msg: impl Into<String>) -> Self {
        Self::Navigation(msg.into())
    }

    /// Returns true for errors caused by invalid geometry input.
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Self::InvalidDimensions { .. } | Self::InvalidBorder(_) | Self::InvalidRatio(_)
        )
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
