// SPDX-License-Identifier: GPL-3.0-only

//! Camera backend abstraction
//!
//! Everything that touches camera hardware goes through [`CameraBackend`].
//! The session manager and the capture coordinator only ever see this trait,
//! so the whole capture flow runs unchanged against the synthetic backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐      ┌──────────────────────┐
//! │ CaptureSessionManager│      │  CaptureCoordinator  │
//! └──────────┬───────────┘      └──────────┬───────────┘
//!            │  (session queue)            │
//!            ▼                             ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                CameraBackend Trait                  │
//! └──────────┬───────────────────────────┬──────────────┘
//!            ▼                           ▼
//!      ┌───────────┐          ┌────────────────────┐
//!      │ Synthetic │          │ V4L2 + GStreamer   │
//!      └───────────┘          │ (feature hardware) │
//!                             └────────────────────┘
//! ```

pub mod manager;
pub mod preview;
pub mod resolver;
pub mod session;
pub mod session_queue;
pub mod synthetic;
pub mod types;
#[cfg(feature = "hardware")]
pub mod v4l2;

pub use manager::{CaptureSessionManager, SessionOptions};
pub use resolver::resolve_default_camera;
pub use synthetic::{SyntheticBackend, SyntheticOutcome};
pub use types::*;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Camera hardware as seen by the capture core
///
/// Implementations must deliver capture results from their own thread and
/// must invoke a delivery callback at most once, and never when
/// [`CameraBackend::capture_photo`] returned an error.
pub trait CameraBackend: Send + Sync {
    // ===== Enumeration =====

    /// Enumerate available video-capable cameras
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// The system default camera, if any
    fn default_device(&self) -> Option<CameraDevice> {
        self.enumerate_cameras().into_iter().next()
    }

    // ===== Device =====

    /// Open a device so it can be attached to a session
    fn open_input(&self, device: &CameraDevice) -> BackendResult<DeviceInput>;

    /// Currently selected format of the device
    fn active_format(&self, device: &CameraDevice) -> BackendResult<CameraFormat>;

    /// Whether [`CameraBackend::wait_for_active_format`] blocks on a real
    /// "format available" signal
    fn supports_format_notification(&self) -> bool {
        false
    }

    /// Block until the device reports its active format, up to `timeout`
    fn wait_for_active_format(
        &self,
        device: &CameraDevice,
        _timeout: Duration,
    ) -> BackendResult<CameraFormat> {
        self.active_format(device)
    }

    /// Photo-output API tier available for this device
    fn capability_tier(&self, device: &CameraDevice) -> CapabilityTier;

    // ===== Stream =====

    /// Start streaming from an opened input
    fn start_running(&self, input: &DeviceInput) -> BackendResult<()>;

    /// Stop streaming and release the device
    fn stop_running(&self, input: &DeviceInput) -> BackendResult<()>;

    // ===== Capture =====

    /// Submit one still capture; the result arrives later through `deliver`
    fn capture_photo(
        &self,
        input: &DeviceInput,
        settings: &PhotoCaptureSettings,
        deliver: PhotoDeliveryCallback,
    ) -> BackendResult<()>;

    // ===== Metadata =====

    fn backend_type(&self) -> CameraBackendType;
}

/// Get a backend instance for the given type
pub fn get_backend_for_type(
    backend_type: CameraBackendType,
) -> BackendResult<Arc<dyn CameraBackend>> {
    match backend_type {
        CameraBackendType::Synthetic => Ok(Arc::new(SyntheticBackend::new())),
        #[cfg(feature = "hardware")]
        CameraBackendType::V4l2 => Ok(Arc::new(v4l2::V4l2Backend::new())),
        #[cfg(not(feature = "hardware"))]
        CameraBackendType::V4l2 => Err(BackendError::NotAvailable(
            "built without the `hardware` feature".to_string(),
        )),
    }
}

/// Lock a mutex, taking over the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_backend_is_always_available() {
        let backend = get_backend_for_type(CameraBackendType::Synthetic).unwrap();
        assert_eq!(backend.backend_type(), CameraBackendType::Synthetic);
        assert!(backend.default_device().is_some());
    }

    #[cfg(not(feature = "hardware"))]
    #[test]
    fn v4l2_needs_hardware_feature() {
        assert!(matches!(
            get_backend_for_type(CameraBackendType::V4l2),
            Err(BackendError::NotAvailable(_))
        ));
    }
}
