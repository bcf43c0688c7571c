// SPDX-License-Identifier: GPL-3.0-only

//! Capture device resolution

use super::CameraBackend;
use super::types::CameraDevice;
use crate::errors::{CameraError, CameraResult};
use tracing::{debug, info, warn};

/// Pick the camera a new session should use
///
/// A `preferred` path or id wins when that device is currently enumerated.
/// Otherwise the backend's default video camera is used. Having no camera at
/// all is an error for the caller, never something to skip quietly.
pub fn resolve_default_camera(
    backend: &dyn CameraBackend,
    preferred: Option<&str>,
) -> CameraResult<CameraDevice> {
    if let Some(selector) = preferred {
        match backend
            .enumerate_cameras()
            .into_iter()
            .find(|device| device.matches(selector))
        {
            Some(device) => {
                info!(device = %device.name, path = %device.path, "Using preferred camera");
                return Ok(device);
            }
            None => {
                warn!(selector, "Preferred camera not present, using default");
            }
        }
    }

    match backend.default_device() {
        Some(device) => {
            debug!(device = %device.name, path = %device.path, "Resolved default camera");
            Ok(device)
        }
        None => {
            warn!(backend = %backend.backend_type(), "No camera device available");
            Err(CameraError::NoDeviceAvailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::SyntheticBackend;

    #[test]
    fn no_camera_is_an_error() {
        let backend = SyntheticBackend::without_devices();
        assert_eq!(
            resolve_default_camera(&backend, None),
            Err(CameraError::NoDeviceAvailable)
        );
    }

    #[test]
    fn preferred_device_wins() {
        let backend = SyntheticBackend::with_device_count(3);
        let device = resolve_default_camera(&backend, Some("/synthetic/2")).unwrap();
        assert_eq!(device.path, "/synthetic/2");
    }

    #[test]
    fn missing_preferred_device_falls_back_to_default() {
        let backend = SyntheticBackend::with_device_count(2);
        let device = resolve_default_camera(&backend, Some("/dev/video9")).unwrap();
        assert_eq!(device.path, "/synthetic/0");
    }
}
