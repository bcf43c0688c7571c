// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! An in-process camera that renders a test pattern and encodes it as JPEG.
//! Device list, active format, capability tier, open failures and the
//! outcome of each capture are all scriptable, so every branch of the
//! capture flow can be driven without hardware.

use super::types::*;
use super::{CameraBackend, lock};
use crate::constants::{photo, threads};
use crate::pipelines::photo::encoding::encode_jpeg;
use image::{Rgb, RgbImage};
use std::collections::HashSet;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the synthetic hardware hands back for a capture
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyntheticOutcome {
    /// A valid JPEG of the negotiated size
    #[default]
    Photo,
    /// No data, only a hardware error
    HardwareError(String),
    /// Bytes that are not an image, optionally with a hardware error
    CorruptData { error: Option<String> },
    /// Neither data nor error
    Empty,
    /// A valid JPEG together with a hardware warning
    PhotoWithError(String),
}

struct SyntheticState {
    devices: Vec<CameraDevice>,
    active_format: CameraFormat,
    sensor_maximum: Dimensions,
    tier: CapabilityTier,
    open_failure: Option<String>,
    start_failure: Option<String>,
    submit_failure: Option<String>,
    outcome: SyntheticOutcome,
    format_notification: bool,
    capture_delay: Duration,
    running: HashSet<Uuid>,
    submitted: Vec<PhotoCaptureSettings>,
}

/// Scriptable in-process camera
pub struct SyntheticBackend {
    state: Mutex<SyntheticState>,
}

impl SyntheticBackend {
    /// One camera at 640x480, modern tier, captures succeed
    pub fn new() -> Self {
        Self::with_device_count(1)
    }

    /// A system without cameras
    pub fn without_devices() -> Self {
        Self::with_device_count(0)
    }

    pub fn with_device_count(count: usize) -> Self {
        let devices = (0..count)
            .map(|index| CameraDevice {
                id: format!("synthetic-{}", index),
                name: format!("Synthetic Camera {}", index),
                path: format!("/synthetic/{}", index),
                device_info: None,
            })
            .collect();

        Self {
            state: Mutex::new(SyntheticState {
                devices,
                active_format: CameraFormat::new(640, 480, "MJPG")
                    .with_framerate(Framerate::from_int(30)),
                sensor_maximum: Dimensions::new(1280, 960),
                tier: CapabilityTier::Modern,
                open_failure: None,
                start_failure: None,
                submit_failure: None,
                outcome: SyntheticOutcome::Photo,
                format_notification: false,
                capture_delay: Duration::from_millis(5),
                running: HashSet::new(),
                submitted: Vec::new(),
            }),
        }
    }

    pub fn with_active_format(self, width: u32, height: u32) -> Self {
        self.set_active_format(width, height);
        self
    }

    /// Largest size the sensor can take stills at
    pub fn with_sensor_maximum(self, width: u32, height: u32) -> Self {
        lock(&self.state).sensor_maximum = Dimensions::new(width, height);
        self
    }

    pub fn with_capability_tier(self, tier: CapabilityTier) -> Self {
        self.set_capability_tier(tier);
        self
    }

    pub fn with_outcome(self, outcome: SyntheticOutcome) -> Self {
        self.set_outcome(outcome);
        self
    }

    /// Opening any device fails with `reason`
    pub fn with_open_failure(self, reason: &str) -> Self {
        lock(&self.state).open_failure = Some(reason.to_string());
        self
    }

    /// Starting the stream fails with `reason`
    pub fn with_start_failure(self, reason: &str) -> Self {
        lock(&self.state).start_failure = Some(reason.to_string());
        self
    }

    /// Submitting a capture fails synchronously with `reason`
    pub fn with_submit_failure(self, reason: &str) -> Self {
        lock(&self.state).submit_failure = Some(reason.to_string());
        self
    }

    /// Report format availability through the notification path
    pub fn with_format_notification(self) -> Self {
        lock(&self.state).format_notification = true;
        self
    }

    pub fn with_capture_delay(self, delay: Duration) -> Self {
        lock(&self.state).capture_delay = delay;
        self
    }

    pub fn set_active_format(&self, width: u32, height: u32) {
        let mut state = lock(&self.state);
        state.active_format.width = width;
        state.active_format.height = height;
        // The sensor is never smaller than what it streams
        let active = state.active_format.dimensions();
        if active.pixel_count() > state.sensor_maximum.pixel_count() {
            state.sensor_maximum = active;
        }
    }

    pub fn set_capability_tier(&self, tier: CapabilityTier) {
        lock(&self.state).tier = tier;
    }

    pub fn set_outcome(&self, outcome: SyntheticOutcome) {
        lock(&self.state).outcome = outcome;
    }

    /// Settings of every capture submitted so far, oldest first
    pub fn submitted_settings(&self) -> Vec<PhotoCaptureSettings> {
        lock(&self.state).submitted.clone()
    }

    /// Number of inputs currently streaming
    pub fn running_count(&self) -> usize {
        lock(&self.state).running.len()
    }

    fn render(size: Dimensions) -> RgbImage {
        let width = size.width.max(1);
        let height = size.height.max(1);
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                ((x + y) % 256) as u8,
            ])
        })
    }

    fn photo_bytes(size: Dimensions) -> Option<Vec<u8>> {
        match encode_jpeg(&Self::render(size), photo::DEFAULT_JPEG_QUALITY) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Synthetic JPEG encoding failed");
                None
            }
        }
    }

    fn build_delivery(outcome: &SyntheticOutcome, size: Dimensions) -> PhotoDelivery {
        match outcome {
            SyntheticOutcome::Photo => PhotoDelivery {
                data: Self::photo_bytes(size),
                error: None,
            },
            SyntheticOutcome::HardwareError(msg) => {
                PhotoDelivery::failed(BackendError::CaptureFailed(msg.clone()))
            }
            SyntheticOutcome::CorruptData { error } => PhotoDelivery {
                data: Some(b"\x00\x01not an image".to_vec()),
                error: error.clone().map(BackendError::CaptureFailed),
            },
            SyntheticOutcome::Empty => PhotoDelivery::default(),
            SyntheticOutcome::PhotoWithError(msg) => PhotoDelivery {
                data: Self::photo_bytes(size),
                error: Some(BackendError::CaptureFailed(msg.clone())),
            },
        }
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for SyntheticBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        lock(&self.state).devices.clone()
    }

    fn open_input(&self, device: &CameraDevice) -> BackendResult<DeviceInput> {
        let state = lock(&self.state);
        if let Some(reason) = &state.open_failure {
            return Err(BackendError::DeviceBusy(reason.clone()));
        }
        if !state.devices.iter().any(|d| d.path == device.path) {
            return Err(BackendError::DeviceNotFound(device.path.clone()));
        }
        debug!(device = %device.name, "Opened synthetic input");
        Ok(DeviceInput::new(device.clone()))
    }

    fn active_format(&self, device: &CameraDevice) -> BackendResult<CameraFormat> {
        let state = lock(&self.state);
        if !state.devices.iter().any(|d| d.path == device.path) {
            return Err(BackendError::DeviceNotFound(device.path.clone()));
        }
        Ok(state.active_format.clone())
    }

    fn supports_format_notification(&self) -> bool {
        lock(&self.state).format_notification
    }

    fn wait_for_active_format(
        &self,
        device: &CameraDevice,
        _timeout: Duration,
    ) -> BackendResult<CameraFormat> {
        // The synthetic sensor settles instantly
        self.active_format(device)
    }

    fn capability_tier(&self, _device: &CameraDevice) -> CapabilityTier {
        lock(&self.state).tier
    }

    fn start_running(&self, input: &DeviceInput) -> BackendResult<()> {
        let mut state = lock(&self.state);
        if let Some(reason) = &state.start_failure {
            return Err(BackendError::InitializationFailed(reason.clone()));
        }
        state.running.insert(input.id);
        info!(device = %input.device.name, "Synthetic stream started");
        Ok(())
    }

    fn stop_running(&self, input: &DeviceInput) -> BackendResult<()> {
        if lock(&self.state).running.remove(&input.id) {
            info!(device = %input.device.name, "Synthetic stream stopped");
        }
        Ok(())
    }

    fn capture_photo(
        &self,
        input: &DeviceInput,
        settings: &PhotoCaptureSettings,
        deliver: PhotoDeliveryCallback,
    ) -> BackendResult<()> {
        let mut state = lock(&self.state);
        if !state.running.contains(&input.id) {
            return Err(BackendError::NotRunning);
        }
        if let Some(reason) = &state.submit_failure {
            return Err(BackendError::CaptureFailed(reason.clone()));
        }
        state.submitted.push(settings.clone());

        let size = match settings.max_dimensions {
            Some(max) => max,
            None if settings.high_resolution_enabled => state.sensor_maximum,
            None => state.active_format.dimensions(),
        };
        let outcome = state.outcome.clone();
        let delay = state.capture_delay;
        drop(state);

        debug!(
            settings = %settings.id,
            size = %size,
            outcome = ?outcome,
            "Synthetic capture submitted"
        );

        thread::Builder::new()
            .name(threads::SYNTHETIC_CALLBACK.to_string())
            .spawn(move || {
                thread::sleep(delay);
                deliver(Self::build_delivery(&outcome, size));
            })
            .map(|_| ())
            .map_err(|e| {
                BackendError::CaptureFailed(format!("cannot spawn callback thread: {}", e))
            })
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Synthetic
    }
}
