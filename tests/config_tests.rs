// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use photo_capture::backends::camera::{CameraBackendType, CapabilityTier, SessionOptions};
use photo_capture::{AppError, Config};
use std::path::PathBuf;
use std::time::Duration;

fn temp_config_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("photo-capture-test-{}", uuid::Uuid::new_v4()))
        .join("config.json")
}

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.backend, CameraBackendType::Synthetic);
    assert_eq!(config.preferred_device, None);
    assert_eq!(
        config.capability_tier, None,
        "Tier should be detected per device by default"
    );
    assert_eq!(config.settle_delay_ms, 500);
}

#[test]
fn test_config_save_and_load() {
    let path = temp_config_path();
    let config = Config {
        backend: CameraBackendType::V4l2,
        preferred_device: Some("/dev/video2".to_string()),
        capability_tier: Some(CapabilityTier::Legacy),
        jpeg_quality: 80,
        ..Config::default()
    };

    config.save_to(&path).unwrap();
    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_config_invalid_json_is_a_config_error() {
    let path = temp_config_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_session_options_follow_config() {
    let config = Config {
        preferred_device: Some("/synthetic/1".to_string()),
        settle_delay_ms: 50,
        format_wait_timeout_ms: 750,
        capability_tier: Some(CapabilityTier::Modern),
        ..Config::default()
    };

    let options = SessionOptions::from(&config);
    assert_eq!(options.preferred_device.as_deref(), Some("/synthetic/1"));
    assert_eq!(options.settle_delay, Duration::from_millis(50));
    assert_eq!(options.format_wait_timeout, Duration::from_millis(750));
    assert_eq!(options.capability_tier, Some(CapabilityTier::Modern));
}

#[test]
fn test_backend_names_parse() {
    assert_eq!(
        "v4l2".parse::<CameraBackendType>(),
        Ok(CameraBackendType::V4l2)
    );
    assert_eq!(
        "Synthetic".parse::<CameraBackendType>(),
        Ok(CameraBackendType::Synthetic)
    );
    assert!("pipewire".parse::<CameraBackendType>().is_err());
}
