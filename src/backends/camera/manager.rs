// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle manager
//!
//! The manager provides:
//! - Session graph construction (device input, photo output)
//! - Preview attachment to a display surface
//! - Start/stop and format settling on the session queue

use super::CameraBackend;
use super::preview::{DisplaySurface, Layer, PreviewLayer};
use super::resolver::resolve_default_camera;
use super::session::{
    CaptureSession, PhotoOutput, SessionHandle, SessionPreset, SessionState, SharedSession,
};
use super::session_queue::{QueueHandle, SessionQueue};
use super::types::*;
use crate::config::Config;
use crate::constants::{threads, timing};
use crate::errors::{CameraError, CameraResult};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Tunables for session setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Camera path or id to prefer over the system default
    pub preferred_device: Option<String>,
    /// Fallback wait before reading the active format
    pub settle_delay: Duration,
    /// Bound on waiting for an explicit format notification
    pub format_wait_timeout: Duration,
    /// Pin the capability tier instead of asking the backend
    pub capability_tier: Option<CapabilityTier>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            preferred_device: None,
            settle_delay: Duration::from_millis(timing::SETTLE_DELAY_MS),
            format_wait_timeout: Duration::from_millis(timing::FORMAT_WAIT_TIMEOUT_MS),
            capability_tier: None,
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            preferred_device: config.preferred_device.clone(),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            format_wait_timeout: Duration::from_millis(config.format_wait_timeout_ms),
            capability_tier: config.capability_tier,
        }
    }
}

/// Owns the capture session and everything that mutates it
///
/// Hardware start/stop never runs on the calling thread: it is queued on a
/// serial session queue shared with the capture coordinator.
pub struct CaptureSessionManager {
    backend: Arc<dyn CameraBackend>,
    options: SessionOptions,
    session: SharedSession,
    queue: SessionQueue,
}

impl CaptureSessionManager {
    /// Create a manager with an empty, uninitialized session
    pub fn new(backend: Arc<dyn CameraBackend>, options: SessionOptions) -> CameraResult<Self> {
        info!(backend = %backend.backend_type(), "Creating capture session manager");

        let queue = SessionQueue::start(threads::SESSION_QUEUE).map_err(|e| {
            CameraError::SessionConfiguration(format!("cannot start session queue: {}", e))
        })?;

        Ok(Self {
            backend,
            options,
            session: SessionHandle::new(CaptureSession::new(SessionPreset::Photo)),
            queue,
        })
    }

    pub fn backend(&self) -> &Arc<dyn CameraBackend> {
        &self.backend
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Shared handle to the current session
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    /// Handle for queuing work behind session start/stop
    pub fn queue_handle(&self) -> QueueHandle {
        self.queue.handle()
    }

    pub fn state(&self) -> SessionState {
        self.session.with(|session| session.state())
    }

    /// Device of the current session's input
    pub fn current_device(&self) -> Option<CameraDevice> {
        self.session
            .with(|session| session.input().map(|input| input.device.clone()))
    }

    /// Maximum photo dimensions configured on the photo output
    pub fn max_photo_dimensions(&self) -> Option<Dimensions> {
        self.session
            .with(|session| session.output().and_then(|o| o.max_photo_dimensions()))
    }

    /// Build a session for the default camera and start it
    ///
    /// Returns once the start has been queued; frames may not flow yet.
    /// Any previous session is torn down first. If the queued start fails the
    /// session ends up `Stopped` with its preview still on `surface` until
    /// [`Self::detach_preview`] or the next `setup_stream` removes it.
    pub fn setup_stream(&self, surface: &mut dyn DisplaySurface) -> CameraResult<()> {
        let previous = self.session.snapshot();
        if previous.input().is_some() && previous.state() != SessionState::Stopped {
            info!(session = %previous.id(), "Replacing existing capture session");
            self.teardown();
        }
        surface.remove_preview(previous.id());

        let mut session = CaptureSession::new(SessionPreset::Photo);
        let session_id = session.id();
        info!(
            session = %session_id,
            backend = %self.backend.backend_type(),
            "Setting up capture session"
        );

        let device = resolve_default_camera(
            self.backend.as_ref(),
            self.options.preferred_device.as_deref(),
        )?;

        let input = self.backend.open_input(&device).map_err(|e| {
            warn!(device = %device.name, error = %e, "Failed to open camera input");
            CameraError::DeviceInputError(e.to_string())
        })?;

        session.add_input(input.clone())?;
        session.add_output(PhotoOutput::new())?;

        let bounds = surface.bounds();
        surface.insert_layer(0, Layer::Preview(PreviewLayer::new(session_id, bounds)));
        debug!(
            session = %session_id,
            width = bounds.width,
            height = bounds.height,
            "Preview layer attached"
        );

        self.session.replace(session);

        self.dispatch_start(session_id, input);
        self.dispatch_format_configuration(session_id, device);

        Ok(())
    }

    /// Stop the current session and release the device
    pub fn teardown(&self) {
        let snapshot = self.session.snapshot();
        let Some(input) = snapshot.input().cloned() else {
            return;
        };
        if snapshot.state() == SessionState::Stopped {
            return;
        }

        let session_id = snapshot.id();
        info!(session = %session_id, "Tearing down capture session");
        self.session
            .update_if_current(session_id, |session| session.mark_stopped());

        let backend = Arc::clone(&self.backend);
        self.queue.handle().dispatch_or_spawn(Box::new(move || {
            match backend.stop_running(&input) {
                Ok(()) => info!(session = %session_id, "Capture session stopped"),
                Err(e) => {
                    warn!(session = %session_id, error = %e, "Failed to stop capture session")
                }
            }
        }));
    }

    /// Take the current session's preview off `surface`
    pub fn detach_preview(&self, surface: &mut dyn DisplaySurface) {
        let session_id = self.session.with(|session| session.id());
        surface.remove_preview(session_id);
        debug!(session = %session_id, "Preview layer detached");
    }

    /// Block until the session reports running
    pub fn wait_until_running(&self, timeout: Duration) -> bool {
        self.session.wait_until(timeout, |session| session.is_running())
    }

    /// Block until all queued session work has finished
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.queue.flush(timeout)
    }

    fn dispatch_start(&self, session_id: Uuid, input: DeviceInput) {
        let backend = Arc::clone(&self.backend);
        let session = Arc::clone(&self.session);

        self.queue.handle().dispatch_or_spawn(Box::new(move || {
            if let Err(e) = backend.start_running(&input) {
                error!(session = %session_id, error = %e, "Failed to start capture session");
                session.update_if_current(session_id, |session| session.mark_stopped());
                return;
            }

            match session.update_if_current(session_id, |session| session.mark_running()) {
                Some(Ok(())) => {
                    info!(
                        session = %session_id,
                        device = %input.device.name,
                        "Capture session running"
                    )
                }
                Some(Err(e)) => {
                    debug!(session = %session_id, error = %e, "Session not marked running")
                }
                None => debug!(session = %session_id, "Session replaced before start completed"),
            }
        }));
    }

    fn dispatch_format_configuration(&self, session_id: Uuid, device: CameraDevice) {
        let backend = Arc::clone(&self.backend);
        let session = Arc::clone(&self.session);
        let options = self.options.clone();

        self.queue.handle().dispatch_or_spawn(Box::new(move || {
            let still_current = session.with(|s| s.id() == session_id && s.is_running());
            if !still_current {
                debug!(session = %session_id, "Skipping format configuration for inactive session");
                return;
            }

            let format = if backend.supports_format_notification() {
                backend.wait_for_active_format(&device, options.format_wait_timeout)
            } else {
                thread::sleep(options.settle_delay);
                backend.active_format(&device)
            };

            let tier = options
                .capability_tier
                .unwrap_or_else(|| backend.capability_tier(&device));

            if !tier.supports_explicit_dimensions() {
                debug!(
                    session = %session_id,
                    tier = %tier,
                    "Photo output keeps implicit maximum"
                );
                return;
            }

            match format {
                Ok(format) => {
                    let dimensions = format.dimensions();
                    let applied = session.update_if_current(session_id, |session| {
                        session
                            .output_mut()
                            .map(|output| output.set_max_photo_dimensions(dimensions))
                            .is_some()
                    });
                    if applied == Some(true) {
                        info!(
                            session = %session_id,
                            format = %format,
                            "Configured maximum photo dimensions"
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        session = %session_id,
                        error = %e,
                        "Active format unavailable, photo output left unconfigured"
                    );
                }
            }
        }));
    }
}

impl Drop for CaptureSessionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for CaptureSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSessionManager")
            .field("backend_type", &self.backend.backend_type())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::SyntheticBackend;
    use crate::backends::camera::preview::{LayerStack, Rect};

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_options() -> SessionOptions {
        SessionOptions {
            settle_delay: Duration::from_millis(5),
            ..SessionOptions::default()
        }
    }

    fn surface() -> LayerStack {
        LayerStack::new(Rect::new(0.0, 0.0, 390.0, 844.0))
    }

    #[test]
    fn setup_reaches_running_with_one_input_and_output() {
        let manager =
            CaptureSessionManager::new(Arc::new(SyntheticBackend::new()), fast_options()).unwrap();
        let mut surface = surface();

        manager.setup_stream(&mut surface).unwrap();
        assert!(manager.wait_until_running(WAIT));

        let session = manager.session().snapshot();
        assert_eq!(session.input_count(), 1);
        assert_eq!(session.output_count(), 1);
        assert_eq!(session.preset(), SessionPreset::Photo);
        assert_eq!(surface.preview_layer().unwrap().session_id(), session.id());
    }

    #[test]
    fn no_camera_is_reported() {
        let manager = CaptureSessionManager::new(
            Arc::new(SyntheticBackend::without_devices()),
            fast_options(),
        )
        .unwrap();
        let mut surface = surface();

        assert_eq!(
            manager.setup_stream(&mut surface),
            Err(CameraError::NoDeviceAvailable)
        );
        assert!(surface.preview_layer().is_none());
        assert_eq!(manager.state(), SessionState::Uninitialized);
    }

    #[test]
    fn teardown_stops_the_session() {
        let backend = Arc::new(SyntheticBackend::new());
        let manager = CaptureSessionManager::new(backend.clone(), fast_options()).unwrap();
        manager.setup_stream(&mut surface()).unwrap();
        assert!(manager.wait_until_running(WAIT));

        manager.teardown();
        assert!(manager.wait_idle(WAIT));
        assert_eq!(manager.state(), SessionState::Stopped);
        assert_eq!(backend.running_count(), 0);
    }

    #[test]
    fn failed_start_keeps_preview_until_detached() {
        let backend = SyntheticBackend::new().with_start_failure("no bandwidth");
        let manager = CaptureSessionManager::new(Arc::new(backend), fast_options()).unwrap();
        let mut surface = surface();
        surface.push_overlay("shutter", Rect::new(150.0, 700.0, 90.0, 90.0));

        manager.setup_stream(&mut surface).unwrap();
        assert!(manager.wait_idle(WAIT));
        assert_eq!(manager.state(), SessionState::Stopped);
        assert!(surface.preview_layer().is_some());

        manager.detach_preview(&mut surface);
        assert!(surface.preview_layer().is_none());
        assert_eq!(surface.layers().len(), 1);
    }

    #[test]
    fn setup_twice_replaces_the_session() {
        let backend = Arc::new(SyntheticBackend::new());
        let manager = CaptureSessionManager::new(backend.clone(), fast_options()).unwrap();
        let mut surface = surface();

        manager.setup_stream(&mut surface).unwrap();
        let first = manager.session().with(|s| s.id());
        manager.setup_stream(&mut surface).unwrap();
        assert!(manager.wait_until_running(WAIT));
        assert!(manager.wait_idle(WAIT));

        assert_ne!(manager.session().with(|s| s.id()), first);
        assert_eq!(backend.running_count(), 1);
        let previews = surface
            .layers()
            .iter()
            .filter(|layer| matches!(layer, Layer::Preview(_)))
            .count();
        assert_eq!(previews, 1);
    }
}
