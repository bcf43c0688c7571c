// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 device discovery and format queries

use super::super::types::*;
use tracing::{debug, info};
use v4l::capability::Flags;
use v4l::framesize::FrameSizeEnum;
use v4l::prelude::*;
use v4l::video::Capture;

/// Enumerate video capture nodes under /dev
///
/// Metadata nodes and output-only devices are skipped.
pub fn enumerate_v4l2_cameras() -> Vec<CameraDevice> {
    let mut nodes: Vec<(u32, String)> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let index = name.strip_prefix("video")?.parse::<u32>().ok()?;
            Some((index, entry.path().to_string_lossy().into_owned()))
        })
        .collect();
    nodes.sort();

    let mut cameras = Vec::new();
    for (_, path) in nodes {
        let Ok(dev) = Device::with_path(&path) else {
            debug!(path = %path, "Cannot open video node");
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            debug!(path = %path, card = %caps.card, "Skipping node without video capture");
            continue;
        }

        let device = CameraDevice {
            id: format!("{}:{}", caps.bus, caps.card),
            name: caps.card.clone(),
            path: path.clone(),
            device_info: Some(DeviceInfo {
                card: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            }),
        };
        info!(
            name = %device.name,
            path = %device.path,
            driver = %caps.driver,
            "Found V4L2 camera"
        );
        cameras.push(device);
    }

    cameras
}

/// Currently configured capture format of a device
pub fn query_active_format(device: &CameraDevice) -> BackendResult<CameraFormat> {
    let dev = open(device)?;
    let format = dev
        .format()
        .map_err(|e| BackendError::FormatNotSupported(e.to_string()))?;

    let mut active = CameraFormat::new(format.width, format.height, &format.fourcc.to_string());
    if let Ok(params) = dev.params()
        && let Some(framerate) =
            Framerate::from_interval(params.interval.numerator, params.interval.denominator)
    {
        active = active.with_framerate(framerate);
    }
    Ok(active)
}

/// Tier from the framesizes the active pixel format advertises
///
/// Discrete sizes can be requested exactly; stepwise or continuous ranges
/// only get the "largest available" treatment.
pub fn query_capability_tier(device: &CameraDevice) -> CapabilityTier {
    let Ok(dev) = open(device) else {
        return CapabilityTier::Legacy;
    };
    let Ok(format) = dev.format() else {
        return CapabilityTier::Legacy;
    };

    match dev.enum_framesizes(format.fourcc) {
        Ok(sizes) if !sizes.is_empty() => {
            let discrete = sizes
                .iter()
                .all(|size| matches!(size.size, FrameSizeEnum::Discrete(_)));
            if discrete {
                CapabilityTier::Modern
            } else {
                CapabilityTier::Legacy
            }
        }
        _ => CapabilityTier::Legacy,
    }
}

/// Largest framesize the active pixel format advertises, with its fourcc
pub fn query_max_framesize(device: &CameraDevice) -> Option<(String, Dimensions)> {
    let dev = open(device).ok()?;
    let format = dev.format().ok()?;
    let sizes = dev.enum_framesizes(format.fourcc).ok()?;

    let largest = sizes
        .iter()
        .map(|size| match &size.size {
            FrameSizeEnum::Discrete(d) => Dimensions::new(d.width, d.height),
            FrameSizeEnum::Stepwise(s) => Dimensions::new(s.max_width, s.max_height),
        })
        .max_by_key(|size| size.pixel_count())?;
    Some((format.fourcc.to_string(), largest))
}

/// Open the device node, distinguishing missing from busy
pub fn open(device: &CameraDevice) -> BackendResult<Device> {
    Device::with_path(&device.path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => BackendError::DeviceNotFound(device.path.clone()),
        _ => BackendError::DeviceBusy(format!("{}: {}", device.path, e)),
    })
}
