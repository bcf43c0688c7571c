// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, CapabilityTier};
use crate::constants::{config as paths, photo, timing};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend to use (synthetic or V4L2)
    pub backend: CameraBackendType,
    /// Camera path or id to use instead of the system default
    pub preferred_device: Option<String>,
    /// Pin the capability tier instead of detecting it per device
    pub capability_tier: Option<CapabilityTier>,
    /// Wait before reading the active format when the backend cannot notify
    pub settle_delay_ms: u64,
    /// Upper bound on waiting for a format notification
    pub format_wait_timeout_ms: u64,
    /// Where the command-line front end saves photos
    pub photo_dir: Option<PathBuf>,
    /// JPEG quality for saved photos (1-100)
    pub jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            preferred_device: None,
            capability_tier: None, // Detect per device
            settle_delay_ms: timing::SETTLE_DELAY_MS,
            format_wait_timeout_ms: timing::FORMAT_WAIT_TIMEOUT_MS,
            photo_dir: None,
            jpeg_quality: photo::DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Config {
    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(paths::APP_DIR).join(paths::FILE_NAME))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            warn!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        debug!(path = %path.display(), backend = %config.backend, "Loaded config");
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::config_path()
            .ok_or_else(|| AppError::Config("no config directory available".to_string()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Photo directory, defaulting to the user's pictures folder
    pub fn photo_dir(&self) -> PathBuf {
        self.photo_dir.clone().unwrap_or_else(|| {
            dirs::picture_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(photo::PHOTO_SUBDIR)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"capability_tier":"legacy"}"#).unwrap();
        assert_eq!(config.capability_tier, Some(CapabilityTier::Legacy));
        assert_eq!(config.settle_delay_ms, timing::SETTLE_DELAY_MS);
        assert_eq!(config.backend, CameraBackendType::Synthetic);
    }

    #[test]
    fn explicit_photo_dir_wins() {
        let config = Config {
            photo_dir: Some(PathBuf::from("/tmp/shots")),
            ..Config::default()
        };
        assert_eq!(config.photo_dir(), PathBuf::from("/tmp/shots"));
    }
}
