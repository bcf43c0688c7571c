// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer pipeline feeding still captures from a V4L2 device

use super::super::types::*;
use crate::constants::{photo, timing};
use crate::pipelines::photo::encode_jpeg;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use image::RgbImage;
use image::imageops::FilterType;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Running v4l2src pipeline with an appsink holding the latest frame
pub struct StillPipeline {
    pipeline: gstreamer::Pipeline,
    appsink: AppSink,
}

impl StillPipeline {
    /// Build the pipeline for `device` and bring it to PLAYING
    pub fn start(device: &CameraDevice) -> BackendResult<Self> {
        info!(device = %device.name, path = %device.path, "Creating V4L2 capture pipeline");

        gstreamer::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;
        gstreamer::ElementFactory::find("v4l2src").ok_or_else(|| {
            BackendError::NotAvailable("v4l2src not available: factory not found".to_string())
        })?;

        // decodebin covers both raw and MJPG sources
        let pipeline_str = format!(
            "v4l2src device=\"{}\" ! decodebin ! videoconvert ! video/x-raw,format=RGB ! \
             appsink name=sink max-buffers=1 drop=true sync=false",
            device.path
        );
        let (pipeline, appsink) = launch(&pipeline_str)?;
        play(&pipeline)?;

        let (result, state, pending) = pipeline.state(gstreamer::ClockTime::from_seconds(
            timing::START_TIMEOUT_SECS,
        ));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");
        if state != gstreamer::State::Playing {
            warn!(device = %device.name, "Pipeline is not in PLAYING state");
        }

        Ok(Self { pipeline, appsink })
    }

    /// Handle to the sink for pulling a frame on another thread
    pub fn sink(&self) -> AppSink {
        self.appsink.clone()
    }

    /// Handle to the pipeline for pausing the stream around a still capture
    pub fn handle(&self) -> gstreamer::Pipeline {
        self.pipeline.clone()
    }

    pub fn stop(self) -> BackendResult<()> {
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;
        Ok(())
    }
}

fn launch(description: &str) -> BackendResult<(gstreamer::Pipeline, AppSink)> {
    debug!(pipeline = %description, "Launching pipeline");

    let pipeline = gstreamer::parse::launch(description)
        .map_err(|e| {
            BackendError::InitializationFailed(format!("Failed to create pipeline: {}", e))
        })?
        .downcast::<gstreamer::Pipeline>()
        .map_err(|_| BackendError::InitializationFailed("Failed to downcast to Pipeline".into()))?;

    let appsink = pipeline
        .by_name("sink")
        .ok_or_else(|| BackendError::InitializationFailed("Failed to get appsink".to_string()))?
        .dynamic_cast::<AppSink>()
        .map_err(|_| BackendError::InitializationFailed("Failed to cast appsink".to_string()))?;

    Ok((pipeline, appsink))
}

/// Bring `pipeline` to PLAYING, releasing the device again if that fails
fn play(pipeline: &gstreamer::Pipeline) -> BackendResult<()> {
    if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
        let _ = pipeline.set_state(gstreamer::State::Null);
        return Err(BackendError::DeviceBusy(format!("Failed to start pipeline: {}", e)));
    }
    Ok(())
}

/// Negotiated format on the appsink, once caps have been fixed
pub fn negotiated_format(sink: &AppSink, pixel_format: &str) -> Option<CameraFormat> {
    let caps = sink.static_pad("sink")?.current_caps()?;
    let info = VideoInfo::from_caps(&caps).ok()?;
    let mut format = CameraFormat::new(info.width(), info.height(), pixel_format);
    let fps = info.fps();
    if fps.numer() > 0 && fps.denom() > 0 {
        format = format.with_framerate(Framerate::new(fps.numer() as u32, fps.denom() as u32));
    }
    Some(format)
}

/// Poll for negotiated caps until `timeout`
pub fn wait_for_format(
    sink: &AppSink,
    pixel_format: &str,
    timeout: Duration,
) -> Option<CameraFormat> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(format) = negotiated_format(sink, pixel_format) {
            return Some(format);
        }
        if Instant::now() >= deadline {
            return None;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Pull the next frame from `sink` and encode it as JPEG
///
/// Frames larger than `settings.max_dimensions` are scaled down to fit.
pub fn capture_still(sink: &AppSink, settings: &PhotoCaptureSettings) -> PhotoDelivery {
    match pull_frame(sink) {
        Ok(frame) => deliver_jpeg(fit_within(frame, settings.max_dimensions)),
        Err(e) => PhotoDelivery::failed(e),
    }
}

/// Take one frame at `size` from a one-shot pipeline
///
/// The streaming pipeline holds the device, so it is set to NULL for the
/// duration and brought back to PLAYING afterwards.
pub fn capture_full_resolution(
    stream: &gstreamer::Pipeline,
    device: &CameraDevice,
    pixel_format: &str,
    size: Dimensions,
) -> PhotoDelivery {
    if let Err(e) = stream.set_state(gstreamer::State::Null) {
        let reason = format!("Failed to release stream for still capture: {}", e);
        return PhotoDelivery::failed(BackendError::DeviceBusy(reason));
    }

    info!(device = %device.name, size = %size, "Capturing still at full resolution");
    let frame = one_shot_frame(device, pixel_format, size);

    if let Err(e) = stream.set_state(gstreamer::State::Playing) {
        warn!(device = %device.name, error = %e, "Failed to restart stream after still capture");
    }

    match frame {
        Ok(frame) => deliver_jpeg(frame),
        Err(e) => PhotoDelivery::failed(e),
    }
}

fn one_shot_frame(
    device: &CameraDevice,
    pixel_format: &str,
    size: Dimensions,
) -> BackendResult<RgbImage> {
    let pipeline_str = format!(
        "v4l2src device=\"{}\" num-buffers=1 ! {} ! decodebin ! videoconvert ! \
         video/x-raw,format=RGB ! appsink name=sink sync=false",
        device.path,
        source_caps(pixel_format, size)
    );
    let (pipeline, appsink) = launch(&pipeline_str)?;
    play(&pipeline)?;
    let frame = pull_frame(&appsink);
    let _ = pipeline.set_state(gstreamer::State::Null);
    frame
}

/// Caps pinning the source to `size` in its native encoding
fn source_caps(pixel_format: &str, size: Dimensions) -> String {
    let media = if pixel_format.eq_ignore_ascii_case("MJPG") {
        "image/jpeg"
    } else {
        "video/x-raw"
    };
    format!("{},width={},height={}", media, size.width, size.height)
}

fn deliver_jpeg(frame: RgbImage) -> PhotoDelivery {
    match encode_jpeg(&frame, photo::DEFAULT_JPEG_QUALITY) {
        Ok(data) => PhotoDelivery::photo(data),
        Err(e) => PhotoDelivery::failed(BackendError::CaptureFailed(e)),
    }
}

fn pull_frame(sink: &AppSink) -> BackendResult<RgbImage> {
    let timeout = timing::CAPTURE_PULL_TIMEOUT.as_millis() as u64;
    let sample = sink
        .try_pull_sample(gstreamer::ClockTime::from_mseconds(timeout))
        .ok_or_else(|| BackendError::CaptureFailed("timeout waiting for a frame".into()))?;

    let caps = sample
        .caps()
        .ok_or_else(|| BackendError::CaptureFailed("No caps on sample".into()))?;
    let info = VideoInfo::from_caps(caps)
        .map_err(|e| BackendError::CaptureFailed(format!("Invalid caps: {}", e)))?;
    let buffer = sample
        .buffer()
        .ok_or_else(|| BackendError::CaptureFailed("No buffer in sample".into()))?;
    let map = buffer
        .map_readable()
        .map_err(|_| BackendError::CaptureFailed("Failed to map buffer".into()))?;

    let stride = info.stride()[0] as usize;
    unpad_rows(map.as_slice(), info.width(), info.height(), stride)
}

/// Copy RGB rows out of a buffer whose rows may be padded to `stride` bytes
fn unpad_rows(data: &[u8], width: u32, height: u32, stride: usize) -> BackendResult<RgbImage> {
    let row_bytes = width as usize * 3;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let line = data
            .get(start..start + row_bytes)
            .ok_or_else(|| BackendError::CaptureFailed("Truncated frame buffer".into()))?;
        pixels.extend_from_slice(line);
    }

    RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| BackendError::CaptureFailed("Frame size mismatch".into()))
}

fn fit_within(frame: RgbImage, max: Option<Dimensions>) -> RgbImage {
    match max {
        Some(max) if frame.width() > max.width || frame.height() > max.height => {
            debug!(
                from = %Dimensions::new(frame.width(), frame.height()),
                to = %max,
                "Scaling frame to requested maximum"
            );
            image::DynamicImage::ImageRgb8(frame)
                .resize(max.width, max.height, FilterType::Triangle)
                .to_rgb8()
        }
        _ => frame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_rows_are_stripped() {
        // 2x2 RGB frame with 2 bytes of padding after each row
        let data = [
            1, 2, 3, 4, 5, 6, 0, 0, //
            7, 8, 9, 10, 11, 12, 0, 0,
        ];
        let frame = unpad_rows(&data, 2, 2, 8).unwrap();
        assert_eq!(frame.as_raw(), &vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn tightly_packed_rows_are_copied() {
        let data: Vec<u8> = (0..18).collect();
        let frame = unpad_rows(&data, 3, 2, 9).unwrap();
        assert_eq!(frame.as_raw(), &data);
    }

    #[test]
    fn truncated_buffer_is_an_error() {
        let data = [0u8; 10];
        let result = unpad_rows(&data, 2, 2, 8);
        assert!(matches!(result, Err(BackendError::CaptureFailed(_))));
    }

    #[test]
    fn larger_frame_is_scaled_to_fit() {
        let frame = RgbImage::new(640, 480);
        let fitted = fit_within(frame, Some(Dimensions::new(320, 320)));
        assert_eq!(fitted.dimensions(), (320, 240));
    }

    #[test]
    fn frame_within_bounds_is_untouched() {
        let frame = RgbImage::new(320, 240);
        let fitted = fit_within(frame.clone(), Some(Dimensions::new(640, 480)));
        assert_eq!(fitted, frame);

        let unbounded = fit_within(frame.clone(), None);
        assert_eq!(unbounded, frame);
    }

    #[test]
    fn failed_start_leaves_pipeline_in_null() {
        gstreamer::init().unwrap();
        if gstreamer::ElementFactory::find("v4l2src").is_none() {
            return;
        }
        let (pipeline, _sink) = launch(
            "v4l2src device=\"/dev/video-missing\" ! decodebin ! videoconvert ! \
             video/x-raw,format=RGB ! appsink name=sink",
        )
        .unwrap();

        assert!(matches!(play(&pipeline), Err(BackendError::DeviceBusy(_))));
        assert_eq!(pipeline.current_state(), gstreamer::State::Null);
    }

    #[test]
    fn source_caps_follow_pixel_format() {
        let size = Dimensions::new(2592, 1944);
        assert_eq!(
            source_caps("MJPG", size),
            "image/jpeg,width=2592,height=1944"
        );
        assert_eq!(
            source_caps("YUYV", size),
            "video/x-raw,width=2592,height=1944"
        );
    }
}
