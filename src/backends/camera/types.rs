// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackendType {
    /// In-process camera producing generated JPEG frames
    #[default]
    Synthetic,
    /// Linux V4L2 devices captured through GStreamer
    V4l2,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::Synthetic => write!(f, "synthetic"),
            CameraBackendType::V4l2 => write!(f, "v4l2"),
        }
    }
}

impl FromStr for CameraBackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(CameraBackendType::Synthetic),
            "v4l2" | "v4l" => Ok(CameraBackendType::V4l2),
            other => Err(format!("unknown camera backend '{}'", other)),
        }
    }
}

/// Device information from V4L2 capability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Bus the device hangs off (e.g. usb-0000:00:14.0-1)
    pub bus: String,
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Stable identifier reported by the backend
    pub id: String,
    pub name: String,
    pub path: String, // Capture node, e.g. /dev/video0
    pub device_info: Option<DeviceInfo>,
}

impl CameraDevice {
    /// Whether `selector` names this device by path or id
    pub fn matches(&self, selector: &str) -> bool {
        self.path == selector || self.id == selector
    }
}

/// Width/height pair in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Framerate as a fraction (numerator/denominator)
/// Stores exact framerate to handle NTSC rates like 59.94fps (60000/1001)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    /// Create a new framerate from numerator and denominator
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    /// Create a framerate from an integer (e.g., 30 becomes 30/1)
    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    /// Build from a V4L2 frame interval (seconds per frame, so inverted)
    pub fn from_interval(numerator: u32, denominator: u32) -> Option<Self> {
        if numerator == 0 {
            return None;
        }
        Some(Self::new(denominator, numerator))
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show decimal for non-integer framerates (NTSC)
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

/// Active format of a camera: resolution, framerate and pixel format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: Option<Framerate>,
    pub pixel_format: String, // FourCC code (e.g., "MJPG", "YUYV")
}

impl CameraFormat {
    pub fn new(width: u32, height: u32, pixel_format: &str) -> Self {
        Self {
            width,
            height,
            framerate: None,
            pixel_format: pixel_format.to_string(),
        }
    }

    pub fn with_framerate(mut self, framerate: Framerate) -> Self {
        self.framerate = Some(framerate);
        self
    }

    /// Native dimensions of this format
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(fps) = &self.framerate {
            write!(
                f,
                "{}x{} @ {}fps {}",
                self.width, self.height, fps, self.pixel_format
            )
        } else {
            write!(f, "{}x{} {}", self.width, self.height, self.pixel_format)
        }
    }
}

/// Which photo-output configuration API the platform offers
///
/// `Modern` can set explicit maximum photo dimensions. `Legacy` only knows a
/// boolean high-resolution switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTier {
    Modern,
    Legacy,
}

impl CapabilityTier {
    pub fn supports_explicit_dimensions(&self) -> bool {
        matches!(self, CapabilityTier::Modern)
    }
}

impl std::fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapabilityTier::Modern => write!(f, "modern"),
            CapabilityTier::Legacy => write!(f, "legacy"),
        }
    }
}

/// An opened camera, ready to be attached to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInput {
    /// Unique per open, so a reopened device is a different input
    pub id: Uuid,
    pub device: CameraDevice,
}

impl DeviceInput {
    pub fn new(device: CameraDevice) -> Self {
        Self {
            id: Uuid::new_v4(),
            device,
        }
    }
}

/// Parameters for exactly one capture request
///
/// Built fresh per request; the `id` ties hardware deliveries back to the
/// request that asked for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoCaptureSettings {
    pub id: Uuid,
    /// Explicit upper bound on the photo size (modern tier)
    pub max_dimensions: Option<Dimensions>,
    /// Ask for the device maximum (legacy tier)
    pub high_resolution_enabled: bool,
}

impl PhotoCaptureSettings {
    /// Settings with an explicit maximum size
    pub fn with_max_dimensions(dimensions: Dimensions) -> Self {
        Self {
            id: Uuid::new_v4(),
            max_dimensions: Some(dimensions),
            high_resolution_enabled: false,
        }
    }

    /// Settings relying on the high-resolution flag
    pub fn high_resolution() -> Self {
        Self {
            id: Uuid::new_v4(),
            max_dimensions: None,
            high_resolution_enabled: true,
        }
    }
}

/// Raw result of a still capture as the hardware hands it over
///
/// Either slot may be empty; interpretation is up to the capture pipeline.
#[derive(Debug, Clone, Default)]
pub struct PhotoDelivery {
    /// Encoded file data of the photo
    pub data: Option<Vec<u8>>,
    /// Error reported while processing the photo
    pub error: Option<BackendError>,
}

impl PhotoDelivery {
    pub fn photo(data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: BackendError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }
}

/// Hardware callback receiving the result of one capture
pub type PhotoDeliveryCallback = Box<dyn FnOnce(PhotoDelivery) + Send + 'static>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Camera is held by another process or access was revoked
    DeviceBusy(String),
    /// Format could not be read or is not supported
    FormatNotSupported(String),
    /// Operation needs a running stream
    NotRunning,
    /// Still capture failed
    CaptureFailed(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::DeviceBusy(msg) => write!(f, "Device busy: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::NotRunning => write!(f, "Stream is not running"),
            BackendError::CaptureFailed(msg) => write!(f, "Capture failed: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_type_parses_names() {
        assert_eq!(
            "Synthetic".parse::<CameraBackendType>(),
            Ok(CameraBackendType::Synthetic)
        );
        assert_eq!(
            "v4l".parse::<CameraBackendType>(),
            Ok(CameraBackendType::V4l2)
        );
        assert!("pipewire".parse::<CameraBackendType>().is_err());
    }

    #[test]
    fn framerate_from_v4l2_interval() {
        let fps = Framerate::from_interval(1001, 30000).unwrap();
        assert_eq!(fps.to_string(), "29.97");
        assert!(Framerate::from_interval(0, 30).is_none());
    }

    #[test]
    fn settings_are_unique_per_request() {
        let a = PhotoCaptureSettings::high_resolution();
        let b = PhotoCaptureSettings::high_resolution();
        assert_ne!(a.id, b.id);
        assert!(a.high_resolution_enabled);
        assert!(a.max_dimensions.is_none());
    }

    #[test]
    fn device_matches_path_or_id() {
        let device = CameraDevice {
            id: "usb-1".into(),
            name: "Webcam".into(),
            path: "/dev/video2".into(),
            device_info: None,
        };
        assert!(device.matches("/dev/video2"));
        assert!(device.matches("usb-1"));
        assert!(!device.matches("/dev/video0"));
    }
}
