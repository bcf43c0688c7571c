// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 camera backend
//!
//! Devices are discovered and queried through V4L2 ioctls. Streaming and
//! still capture go through a GStreamer `v4l2src` pipeline per open input.

mod enumeration;
mod pipeline;

use super::types::*;
use super::{CameraBackend, lock};
use crate::constants::threads;
pub use enumeration::{enumerate_v4l2_cameras, query_active_format, query_capability_tier};
use pipeline::StillPipeline;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Linux camera backend
#[derive(Default)]
pub struct V4l2Backend {
    pipelines: Mutex<HashMap<Uuid, (CameraDevice, StillPipeline)>>,
}

impl V4l2Backend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        enumerate_v4l2_cameras()
    }

    fn open_input(&self, device: &CameraDevice) -> BackendResult<DeviceInput> {
        // Opening the node verifies presence and permissions
        let dev = enumeration::open(device)?;
        drop(dev);
        Ok(DeviceInput::new(device.clone()))
    }

    fn active_format(&self, device: &CameraDevice) -> BackendResult<CameraFormat> {
        query_active_format(device)
    }

    fn supports_format_notification(&self) -> bool {
        true
    }

    fn wait_for_active_format(
        &self,
        device: &CameraDevice,
        timeout: Duration,
    ) -> BackendResult<CameraFormat> {
        let pixel_format = query_active_format(device)
            .map(|format| format.pixel_format)
            .unwrap_or_default();

        let negotiated = {
            let pipelines = lock(&self.pipelines);
            pipelines
                .values()
                .find(|(running, _)| running.path == device.path)
                .map(|(_, pipeline)| pipeline.sink())
        };
        let Some(sink) = negotiated else {
            return query_active_format(device);
        };

        // Poll without holding the registry lock
        match pipeline::wait_for_format(&sink, &pixel_format, timeout) {
            Some(format) => {
                debug!(device = %device.name, format = %format, "Format negotiated");
                Ok(format)
            }
            None => {
                warn!(device = %device.name, "No negotiated format before timeout");
                query_active_format(device)
            }
        }
    }

    fn capability_tier(&self, device: &CameraDevice) -> CapabilityTier {
        query_capability_tier(device)
    }

    fn start_running(&self, input: &DeviceInput) -> BackendResult<()> {
        if lock(&self.pipelines).contains_key(&input.id) {
            return Ok(());
        }
        let pipeline = StillPipeline::start(&input.device)?;
        lock(&self.pipelines).insert(input.id, (input.device.clone(), pipeline));
        info!(device = %input.device.name, "V4L2 stream started");
        Ok(())
    }

    fn stop_running(&self, input: &DeviceInput) -> BackendResult<()> {
        let Some((device, pipeline)) = lock(&self.pipelines).remove(&input.id) else {
            return Ok(());
        };
        pipeline.stop()?;
        info!(device = %device.name, "V4L2 stream stopped");
        Ok(())
    }

    fn capture_photo(
        &self,
        input: &DeviceInput,
        settings: &PhotoCaptureSettings,
        deliver: PhotoDeliveryCallback,
    ) -> BackendResult<()> {
        let (sink, stream) = lock(&self.pipelines)
            .get(&input.id)
            .map(|(_, pipeline)| (pipeline.sink(), pipeline.handle()))
            .ok_or(BackendError::NotRunning)?;

        let device = input.device.clone();
        let settings = settings.clone();
        std::thread::Builder::new()
            .name(threads::V4L2_CALLBACK.to_string())
            .spawn(move || {
                let delivery = match full_resolution_target(&device, &settings) {
                    Some((fourcc, size)) => {
                        pipeline::capture_full_resolution(&stream, &device, &fourcc, size)
                    }
                    None => pipeline::capture_still(&sink, &settings),
                };
                deliver(delivery)
            })
            .map_err(|e| BackendError::Other(format!("cannot spawn capture thread: {}", e)))?;
        Ok(())
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}

/// Size to reopen the device at when the stream is smaller than the sensor
///
/// Only applies when the settings ask for the largest available size instead
/// of explicit dimensions.
fn full_resolution_target(
    device: &CameraDevice,
    settings: &PhotoCaptureSettings,
) -> Option<(String, Dimensions)> {
    if !settings.high_resolution_enabled || settings.max_dimensions.is_some() {
        return None;
    }
    let (fourcc, largest) = enumeration::query_max_framesize(device)?;
    let active = query_active_format(device).ok()?.dimensions();
    (largest.pixel_count() > active.pixel_count()).then_some((fourcc, largest))
}

impl Drop for V4l2Backend {
    fn drop(&mut self) {
        for (_, (device, pipeline)) in lock(&self.pipelines).drain() {
            if let Err(e) = pipeline.stop() {
                warn!(device = %device.name, error = %e, "Failed to stop pipeline on drop");
            }
        }
    }
}
