// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking photos
//! - Showing the configuration

use photo_capture::backends::camera::preview::LayerStack;
use photo_capture::backends::camera::{Dimensions, get_backend_for_type};
use photo_capture::constants::timing;
use photo_capture::pipelines::photo::{EncodingFormat, PhotoEncoder};
use photo_capture::{CameraService, CameraServiceImpl, Config};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Headless preview size used when there is no window
const HEADLESS_SURFACE: Dimensions = Dimensions {
    width: 1280,
    height: 720,
};

/// List all available cameras
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(config.backend)?;
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    let default_path = backend.default_device().map(|device| device.path);

    println!("Available cameras ({}):", config.backend);
    println!();
    for camera in &cameras {
        let marker = if default_path.as_deref() == Some(camera.path.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("  {}{}", camera.name, marker);
        println!("      Path: {}", camera.path);

        match backend.active_format(camera) {
            Ok(format) => println!("      Format: {}", format),
            Err(e) => println!("      Format: unavailable ({})", e),
        }
        println!("      Photo API: {}", backend.capability_tier(camera));
        println!();
    }

    Ok(())
}

/// Take a photo with the configured camera and save it
pub fn take_photo(
    config: &Config,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = CameraServiceImpl::from_config(config)?;

    let mut surface = LayerStack::headless(HEADLESS_SURFACE);
    service.setup_stream(&mut surface)?;

    let start_timeout = Duration::from_secs(timing::START_TIMEOUT_SECS);
    let started = Instant::now();
    if !service.manager().wait_until_running(start_timeout) {
        service.manager().detach_preview(&mut surface);
        return Err(format!(
            "Camera did not start within {}s",
            timing::START_TIMEOUT_SECS
        )
        .into());
    }
    // Let the format settle before capturing
    service.manager().wait_idle(start_timeout);

    if let Some(device) = service.manager().current_device() {
        println!("Using camera: {}", device.name);
    }
    if let Some(dimensions) = service.manager().max_photo_dimensions() {
        println!("Capture size: {}", dimensions);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let saved = runtime.block_on(async {
        let photo = service.capture_photo_async().await?;
        println!(
            "Captured {} in {:.2}s",
            photo.dimensions(),
            started.elapsed().as_secs_f32()
        );

        let mut encoder = PhotoEncoder::new();
        encoder.set_quality(config.jpeg_quality);

        let path = match output {
            Some(path) if path.is_dir() => {
                let encoded = encoder.encode(&photo).await?;
                encoder.save(encoded, path).await?
            }
            Some(path) => {
                encoder.set_format(EncodingFormat::from_path(&path));
                let encoded = encoder.encode(&photo).await?;
                encoder.save_to(encoded, path).await?
            }
            None => {
                let encoded = encoder.encode(&photo).await?;
                encoder.save(encoded, config.photo_dir()).await?
            }
        };
        Ok::<PathBuf, Box<dyn std::error::Error>>(path)
    })?;

    service.manager().teardown();
    service.manager().wait_idle(start_timeout);
    service.manager().detach_preview(&mut surface);

    println!("Photo saved: {}", saved.display());
    Ok(())
}

/// Print the effective configuration as JSON
pub fn print_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = Config::config_path() {
        println!("# {}", path.display());
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
