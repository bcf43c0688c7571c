// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture core

use std::fmt;

/// Result type alias for capture operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Errors surfaced by session setup and photo capture
///
/// Setup-time variants are returned from `setup_stream`. Capture-time
/// variants only ever travel through a capture completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// No usable camera at setup time
    NoDeviceAvailable,
    /// Camera exists but could not be opened or wired into the session
    DeviceInputError(String),
    /// Delivered by the hardware while processing a photo
    HardwareCaptureError(String),
    /// Captured data could not be turned into an image
    DecodeFailure(String),
    /// A capture is already pending
    CaptureInProgress,
    /// Capture requested without a running session
    SessionNotRunning,
    /// Session graph rejected a change
    SessionConfiguration(String),
}

impl CameraError {
    /// Generic decode failure used when the hardware reported nothing
    pub fn decode_failure() -> Self {
        CameraError::DecodeFailure("photo data could not be decoded".to_string())
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoDeviceAvailable => write!(f, "No camera device available"),
            CameraError::DeviceInputError(msg) => write!(f, "Cannot open camera input: {}", msg),
            CameraError::HardwareCaptureError(msg) => write!(f, "Capture failed: {}", msg),
            CameraError::DecodeFailure(msg) => write!(f, "Decode failed: {}", msg),
            CameraError::CaptureInProgress => write!(f, "A capture is already in progress"),
            CameraError::SessionNotRunning => write!(f, "Capture session is not running"),
            CameraError::SessionConfiguration(msg) => {
                write!(f, "Session configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CameraError {}

/// Application-level error used by the binary and configuration layer
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera-related errors
    Camera(CameraError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_wraps_camera_error() {
        let err: AppError = CameraError::NoDeviceAvailable.into();
        assert_eq!(err.to_string(), "Camera error: No camera device available");
    }

    #[test]
    fn io_errors_are_storage_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Storage(msg) if msg.contains("read-only")));
    }
}
