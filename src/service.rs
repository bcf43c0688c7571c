// SPDX-License-Identifier: GPL-3.0-only

//! Camera service facade
//!
//! Bundles the session manager and the capture coordinator behind the two
//! operations a UI needs: show a preview and take a photo.

use crate::backends::camera::preview::DisplaySurface;
use crate::backends::camera::{
    CameraBackend, CaptureSessionManager, SessionOptions, get_backend_for_type,
};
use crate::config::Config;
use crate::errors::{AppError, AppResult, CameraResult};
use crate::pipelines::photo::{CaptureCompletion, CaptureCoordinator, CapturedImage};
use std::sync::Arc;

/// Camera operations exposed to a UI
pub trait CameraService: Send + Sync {
    /// Build and start a capture session and attach its preview to `surface`
    fn setup_stream(&self, surface: &mut dyn DisplaySurface) -> CameraResult<()>;

    /// Take one photo; `on_complete` runs exactly once on another thread
    fn capture_photo(&self, on_complete: CaptureCompletion);
}

pub struct CameraServiceImpl {
    manager: CaptureSessionManager,
    coordinator: CaptureCoordinator,
}

impl CameraServiceImpl {
    pub fn new(backend: Arc<dyn CameraBackend>, options: SessionOptions) -> CameraResult<Self> {
        let pinned_tier = options.capability_tier;
        let manager = CaptureSessionManager::new(Arc::clone(&backend), options)?;
        let coordinator = CaptureCoordinator::new(
            backend,
            manager.session(),
            manager.queue_handle(),
            pinned_tier,
        );
        Ok(Self {
            manager,
            coordinator,
        })
    }

    /// Service for the configured backend
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let backend = get_backend_for_type(config.backend)
            .map_err(|e| AppError::Other(format!("{} backend: {}", config.backend, e)))?;
        Ok(Self::new(backend, SessionOptions::from(config))?)
    }

    pub fn manager(&self) -> &CaptureSessionManager {
        &self.manager
    }

    pub fn coordinator(&self) -> &CaptureCoordinator {
        &self.coordinator
    }

    pub async fn capture_photo_async(&self) -> CameraResult<CapturedImage> {
        self.coordinator.capture_photo_async().await
    }
}

impl CameraService for CameraServiceImpl {
    fn setup_stream(&self, surface: &mut dyn DisplaySurface) -> CameraResult<()> {
        self.manager.setup_stream(surface)
    }

    fn capture_photo(&self, on_complete: CaptureCompletion) {
        self.coordinator.capture_photo_boxed(on_complete);
    }
}
