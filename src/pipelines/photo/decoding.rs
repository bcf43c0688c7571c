// SPDX-License-Identifier: GPL-3.0-only

//! Turning hardware deliveries into images
//!
//! A delivery carries optional file data and an optional hardware error.
//! [`resolve_delivery`] collapses that pair into exactly one outcome.

use crate::backends::camera::types::{Dimensions, PhotoDelivery};
use crate::errors::{CameraError, CameraResult};
use chrono::{DateTime, Local};
use image::RgbaImage;
use tracing::{debug, warn};
use uuid::Uuid;

/// A decoded photo, ready for display
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Decoded bitmap
    pub image: RgbaImage,
    /// Settings id of the request that produced it
    pub settings_id: Uuid,
    pub captured_at: DateTime<Local>,
}

impl CapturedImage {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }
}

/// Decode encoded photo data into an RGBA bitmap
pub fn decode_photo(data: &[u8]) -> Result<RgbaImage, String> {
    if data.is_empty() {
        return Err("photo data is empty".to_string());
    }
    image::load_from_memory(data)
        .map(|image| image.to_rgba8())
        .map_err(|e| format!("photo data could not be decoded: {}", e))
}

/// Map a raw delivery to the single result handed to the caller
///
/// Decodable data wins. Otherwise the delivered hardware error is reported,
/// and only when the hardware reported none does the decode failure surface.
pub fn resolve_delivery(delivery: PhotoDelivery, settings_id: Uuid) -> CameraResult<CapturedImage> {
    let PhotoDelivery { data, error } = delivery;
    let hardware_error = error.map(|e| CameraError::HardwareCaptureError(e.to_string()));

    let decoded = match data.as_deref().map(decode_photo) {
        Some(Ok(image)) => image,
        Some(Err(reason)) => {
            debug!(settings = %settings_id, reason, "Delivered photo data is unusable");
            return Err(hardware_error.unwrap_or(CameraError::DecodeFailure(reason)));
        }
        None => return Err(hardware_error.unwrap_or_else(CameraError::decode_failure)),
    };

    if let Some(error) = hardware_error {
        warn!(settings = %settings_id, error = %error, "Photo decoded despite hardware error");
    }

    Ok(CapturedImage {
        image: decoded,
        settings_id,
        captured_at: Local::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::BackendError;
    use crate::pipelines::photo::encoding::encode_jpeg;
    use image::RgbImage;

    fn jpeg() -> Vec<u8> {
        encode_jpeg(&RgbImage::new(8, 6), 80).unwrap()
    }

    #[test]
    fn valid_data_decodes() {
        let result = resolve_delivery(PhotoDelivery::photo(jpeg()), Uuid::new_v4()).unwrap();
        assert_eq!(result.dimensions(), Dimensions::new(8, 6));
    }

    #[test]
    fn missing_data_reports_hardware_error() {
        let delivery = PhotoDelivery::failed(BackendError::CaptureFailed("sensor timeout".into()));
        let err = resolve_delivery(delivery, Uuid::new_v4()).unwrap_err();
        assert_eq!(
            err,
            CameraError::HardwareCaptureError("Capture failed: sensor timeout".into())
        );
    }

    #[test]
    fn garbage_without_hardware_error_is_decode_failure() {
        let delivery = PhotoDelivery::photo(b"garbage".to_vec());
        let err = resolve_delivery(delivery, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CameraError::DecodeFailure(_)));
    }

    #[test]
    fn garbage_with_hardware_error_reports_hardware_error() {
        let delivery = PhotoDelivery {
            data: Some(b"garbage".to_vec()),
            error: Some(BackendError::CaptureFailed("overexposed".into())),
        };
        let err = resolve_delivery(delivery, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CameraError::HardwareCaptureError(_)));
    }

    #[test]
    fn empty_delivery_is_decode_failure() {
        let err = resolve_delivery(PhotoDelivery::default(), Uuid::new_v4()).unwrap_err();
        assert_eq!(err, CameraError::decode_failure());
    }

    #[test]
    fn decodable_data_wins_over_hardware_error() {
        let delivery = PhotoDelivery {
            data: Some(jpeg()),
            error: Some(BackendError::CaptureFailed("lens warning".into())),
        };
        assert!(resolve_delivery(delivery, Uuid::new_v4()).is_ok());
    }
}
