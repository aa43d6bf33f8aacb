// SPDX-License-Identifier: MPL-2.0

//! Error types for the photobooth application

use std::fmt;

use crate::booth::gallery::PhotoId;

/// Result type alias using BoothError
pub type BoothResult<T> = Result<T, BoothError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum BoothError {
    /// Camera-related errors
    Camera(CameraError),
    /// Photo capture errors
    Capture(CaptureError),
    /// Gallery errors
    Gallery(GalleryError),
    /// Export errors
    Export(ExportError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Camera-specific errors
#[derive(Debug, Clone)]
pub enum CameraError {
    /// Access to the camera was denied by the host
    AccessDenied(String),
    /// No camera devices found
    NoCameraFound,
    /// Camera initialization failed
    InitializationFailed(String),
    /// Camera disconnected during operation
    Disconnected,
    /// Requested format not supported
    FormatNotSupported(String),
    /// Camera is busy or in use
    Busy,
}

/// Photo capture errors
#[derive(Debug, Clone)]
pub enum CaptureError {
    /// No frame available for capture
    NoFrameAvailable,
    /// Encoding failed
    EncodingFailed(String),
}

/// Gallery errors
#[derive(Debug, Clone)]
pub enum GalleryError {
    /// No photo with the given identifier
    PhotoNotFound(PhotoId),
}

/// Export errors
#[derive(Debug, Clone)]
pub enum ExportError {
    /// Writing the export file failed
    WriteFailed(String),
    /// A bulk export is already running
    AlreadyRunning,
    /// The photo's artifact handle was revoked before the export fired
    ArtifactRevoked,
}

impl fmt::Display for BoothError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoothError::Camera(e) => write!(f, "Camera error: {}", e),
            BoothError::Capture(e) => write!(f, "Capture error: {}", e),
            BoothError::Gallery(e) => write!(f, "Gallery error: {}", e),
            BoothError::Export(e) => write!(f, "Export error: {}", e),
            BoothError::Config(msg) => write!(f, "Configuration error: {}", msg),
            BoothError::Storage(msg) => write!(f, "Storage error: {}", msg),
            BoothError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::AccessDenied(msg) => write!(f, "Camera access denied: {}", msg),
            CameraError::NoCameraFound => write!(f, "No camera devices found"),
            CameraError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            CameraError::Disconnected => write!(f, "Camera disconnected"),
            CameraError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            CameraError::Busy => write!(f, "Camera is busy"),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoFrameAvailable => write!(f, "No frame available for capture"),
            CaptureError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for GalleryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GalleryError::PhotoNotFound(id) => write!(f, "No photo with id {}", id),
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::WriteFailed(msg) => write!(f, "Failed to write export: {}", msg),
            ExportError::AlreadyRunning => write!(f, "Export already in progress"),
            ExportError::ArtifactRevoked => write!(f, "Photo data was already released"),
        }
    }
}

impl std::error::Error for BoothError {}
impl std::error::Error for CameraError {}
impl std::error::Error for CaptureError {}
impl std::error::Error for GalleryError {}
impl std::error::Error for ExportError {}

// Conversions from sub-errors to BoothError
impl From<CameraError> for BoothError {
    fn from(err: CameraError) -> Self {
        BoothError::Camera(err)
    }
}

impl From<CaptureError> for BoothError {
    fn from(err: CaptureError) -> Self {
        BoothError::Capture(err)
    }
}

impl From<GalleryError> for BoothError {
    fn from(err: GalleryError) -> Self {
        BoothError::Gallery(err)
    }
}

impl From<ExportError> for BoothError {
    fn from(err: ExportError) -> Self {
        BoothError::Export(err)
    }
}

impl From<String> for BoothError {
    fn from(msg: String) -> Self {
        BoothError::Other(msg)
    }
}

impl From<&str> for BoothError {
    fn from(msg: &str) -> Self {
        BoothError::Other(msg.to_string())
    }
}

// Conversions for I/O errors
impl From<std::io::Error> for BoothError {
    fn from(err: std::io::Error) -> Self {
        BoothError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::WriteFailed(err.to_string())
    }
}
