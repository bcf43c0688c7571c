// SPDX-License-Identifier: GPL-3.0-only

//! Capture request/completion coordination
//!
//! At most one capture is in flight. Its completion lives in a single slot
//! owned by the coordinator; whoever takes the request out of the slot is
//! the only one allowed to invoke it, which makes the completion fire
//! exactly once.

use super::decoding::{CapturedImage, resolve_delivery};
use super::negotiation::PhotoOutputNegotiator;
use crate::backends::camera::session::SharedSession;
use crate::backends::camera::session_queue::QueueHandle;
use crate::backends::camera::types::CapabilityTier;
use crate::backends::camera::{CameraBackend, lock};
use crate::errors::{CameraError, CameraResult};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Completion for one capture request
pub type CaptureCompletion = Box<dyn FnOnce(CameraResult<CapturedImage>) + Send + 'static>;

/// The single outstanding capture
struct PendingCaptureRequest {
    id: Uuid,
    issued_at: Instant,
    on_complete: CaptureCompletion,
}

impl PendingCaptureRequest {
    fn new(on_complete: CaptureCompletion) -> Self {
        Self {
            id: Uuid::new_v4(),
            issued_at: Instant::now(),
            on_complete,
        }
    }
}

impl std::fmt::Debug for PendingCaptureRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCaptureRequest")
            .field("id", &self.id)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

type PendingSlot = Arc<Mutex<Option<PendingCaptureRequest>>>;

/// Take the request with `request_id` out of the slot and complete it
///
/// Returns false when the slot holds a different request or none.
fn complete(slot: &PendingSlot, request_id: Uuid, result: CameraResult<CapturedImage>) -> bool {
    let request = {
        let mut pending = lock(slot);
        match pending.as_ref() {
            Some(request) if request.id == request_id => pending.take(),
            _ => None,
        }
    };

    let Some(request) = request else {
        warn!(request = %request_id, "Dropping completion for a request that is no longer pending");
        return false;
    };

    match &result {
        Ok(image) => info!(
            request = %request_id,
            width = image.image.width(),
            height = image.image.height(),
            elapsed_ms = request.issued_at.elapsed().as_millis() as u64,
            "Capture completed"
        ),
        Err(e) => warn!(request = %request_id, error = %e, "Capture failed"),
    }

    (request.on_complete)(result);
    true
}

/// Issues captures and routes their results back to the caller
pub struct CaptureCoordinator {
    backend: Arc<dyn CameraBackend>,
    session: SharedSession,
    queue: QueueHandle,
    negotiator: PhotoOutputNegotiator,
    pinned_tier: Option<CapabilityTier>,
    pending: PendingSlot,
}

impl CaptureCoordinator {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        session: SharedSession,
        queue: QueueHandle,
        pinned_tier: Option<CapabilityTier>,
    ) -> Self {
        Self {
            negotiator: PhotoOutputNegotiator::new(Arc::clone(&backend)),
            backend,
            session,
            queue,
            pinned_tier,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a capture is waiting for its result
    pub fn has_pending_request(&self) -> bool {
        lock(&self.pending).is_some()
    }

    /// Request a photo; `on_complete` receives the outcome exactly once
    ///
    /// Never blocks and never invokes `on_complete` from inside this call.
    /// A request made while another is pending is rejected with
    /// [`CameraError::CaptureInProgress`]; the pending one is unaffected.
    pub fn capture_photo<F>(&self, on_complete: F)
    where
        F: FnOnce(CameraResult<CapturedImage>) + Send + 'static,
    {
        self.capture_photo_boxed(Box::new(on_complete));
    }

    pub(crate) fn capture_photo_boxed(&self, on_complete: CaptureCompletion) {
        let request_id = {
            let mut pending = lock(&self.pending);
            if let Some(current) = pending.as_ref() {
                warn!(pending = %current.id, "Rejecting capture while another is pending");
                drop(pending);
                self.queue.dispatch_or_spawn(Box::new(move || {
                    on_complete(Err(CameraError::CaptureInProgress));
                }));
                return;
            }
            let request = PendingCaptureRequest::new(on_complete);
            let id = request.id;
            *pending = Some(request);
            id
        };

        debug!(request = %request_id, "Capture requested");

        let backend = Arc::clone(&self.backend);
        let session = Arc::clone(&self.session);
        let negotiator = self.negotiator.clone();
        let pinned_tier = self.pinned_tier;
        let pending = Arc::clone(&self.pending);

        self.queue.dispatch_or_spawn(Box::new(move || {
            submit(
                &*backend,
                &session,
                &negotiator,
                pinned_tier,
                &pending,
                request_id,
            );
        }));
    }

    /// Capture and await the outcome
    pub async fn capture_photo_async(&self) -> CameraResult<CapturedImage> {
        let (sender, receiver) = tokio::sync::oneshot::channel();
        self.capture_photo(move |result| {
            let _ = sender.send(result);
        });
        receiver.await.unwrap_or_else(|_| {
            Err(CameraError::HardwareCaptureError(
                "capture completion was dropped".to_string(),
            ))
        })
    }
}

/// Runs on the session queue: negotiate settings and hand the request to
/// the hardware
fn submit(
    backend: &dyn CameraBackend,
    session: &SharedSession,
    negotiator: &PhotoOutputNegotiator,
    pinned_tier: Option<CapabilityTier>,
    pending: &PendingSlot,
    request_id: Uuid,
) {
    let graph = session.with(|s| {
        if !s.is_running() {
            return None;
        }
        Some((s.input()?.clone(), s.output()?.clone()))
    });
    let Some((input, output)) = graph else {
        complete(pending, request_id, Err(CameraError::SessionNotRunning));
        return;
    };

    let tier = negotiator.capability_tier(&output, pinned_tier);
    let settings = negotiator.build_capture_settings(&output, tier);
    let settings_id = settings.id;

    info!(
        request = %request_id,
        tier = %tier,
        max_dimensions = ?settings.max_dimensions,
        high_resolution = settings.high_resolution_enabled,
        "Submitting capture"
    );

    let delivery_slot = Arc::clone(pending);
    let submitted = backend.capture_photo(
        &input,
        &settings,
        Box::new(move |delivery| {
            complete(
                &delivery_slot,
                request_id,
                resolve_delivery(delivery, settings_id),
            );
        }),
    );

    if let Err(e) = submitted {
        complete(
            pending,
            request_id,
            Err(CameraError::HardwareCaptureError(e.to_string())),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::SyntheticBackend;
    use crate::backends::camera::session::{CaptureSession, SessionHandle, SessionPreset};
    use crate::backends::camera::session_queue::SessionQueue;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn capture_without_running_session_fails() {
        let queue = SessionQueue::start("capture-test").unwrap();
        let coordinator = CaptureCoordinator::new(
            Arc::new(SyntheticBackend::new()),
            SessionHandle::new(CaptureSession::new(SessionPreset::Photo)),
            queue.handle(),
            None,
        );

        let (tx, rx) = mpsc::channel();
        coordinator.capture_photo(move |result| tx.send(result).unwrap());

        let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(result, Err(CameraError::SessionNotRunning)));
        assert!(!coordinator.has_pending_request());
    }

    #[test]
    fn stale_completion_is_dropped() {
        let slot: PendingSlot = Arc::new(Mutex::new(None));
        assert!(!complete(&slot, Uuid::new_v4(), Err(CameraError::decode_failure())));
    }
}
