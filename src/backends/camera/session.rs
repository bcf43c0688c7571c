// SPDX-License-Identifier: GPL-3.0-only

//! Capture session graph
//!
//! A [`CaptureSession`] connects at most one camera input to at most one
//! photo output. The graph can only change while the session is not running.

use super::lock;
use super::types::{DeviceInput, Dimensions};
use crate::errors::{CameraError, CameraResult};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// Quality preset of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPreset {
    /// Full-resolution stills
    #[default]
    Photo,
}

/// Lifecycle of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    /// Inputs/outputs being attached, start not yet confirmed
    Configuring,
    Running,
    Stopped,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Configuring => write!(f, "configuring"),
            SessionState::Running => write!(f, "running"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Still-photo output of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoOutput {
    id: Uuid,
    max_photo_dimensions: Option<Dimensions>,
    /// Input feeding this output, set once both are in the same session
    connection: Option<DeviceInput>,
}

impl PhotoOutput {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            max_photo_dimensions: None,
            connection: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Input currently connected to this output
    pub fn connected_input(&self) -> Option<&DeviceInput> {
        self.connection.as_ref()
    }

    pub fn max_photo_dimensions(&self) -> Option<Dimensions> {
        self.max_photo_dimensions
    }

    pub fn set_max_photo_dimensions(&mut self, dimensions: Dimensions) {
        self.max_photo_dimensions = Some(dimensions);
    }
}

impl Default for PhotoOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// The live graph connecting a camera input to a photo output
#[derive(Debug, Clone)]
pub struct CaptureSession {
    id: Uuid,
    preset: SessionPreset,
    input: Option<DeviceInput>,
    output: Option<PhotoOutput>,
    state: SessionState,
}

impl CaptureSession {
    pub fn new(preset: SessionPreset) -> Self {
        Self {
            id: Uuid::new_v4(),
            preset,
            input: None,
            output: None,
            state: SessionState::Uninitialized,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn preset(&self) -> SessionPreset {
        self.preset
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn input(&self) -> Option<&DeviceInput> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&PhotoOutput> {
        self.output.as_ref()
    }

    pub fn output_mut(&mut self) -> Option<&mut PhotoOutput> {
        self.output.as_mut()
    }

    pub fn input_count(&self) -> usize {
        usize::from(self.input.is_some())
    }

    pub fn output_count(&self) -> usize {
        usize::from(self.output.is_some())
    }

    fn ensure_reconfigurable(&self) -> CameraResult<()> {
        if self.state == SessionState::Running {
            return Err(CameraError::SessionConfiguration(
                "session must be stopped before it is reconfigured".to_string(),
            ));
        }
        Ok(())
    }

    /// Attach the camera input
    pub fn add_input(&mut self, input: DeviceInput) -> CameraResult<()> {
        self.ensure_reconfigurable()?;
        if self.input.is_some() {
            return Err(CameraError::SessionConfiguration(
                "session already has an input".to_string(),
            ));
        }
        if let Some(output) = self.output.as_mut() {
            output.connection = Some(input.clone());
        }
        self.input = Some(input);
        self.state = SessionState::Configuring;
        Ok(())
    }

    /// Attach the photo output, connecting it to the input if there is one
    pub fn add_output(&mut self, mut output: PhotoOutput) -> CameraResult<()> {
        self.ensure_reconfigurable()?;
        if self.output.is_some() {
            return Err(CameraError::SessionConfiguration(
                "session already has an output".to_string(),
            ));
        }
        output.connection = self.input.clone();
        self.output = Some(output);
        self.state = SessionState::Configuring;
        Ok(())
    }

    /// Record that the hardware confirmed the start
    pub fn mark_running(&mut self) -> CameraResult<()> {
        if self.input.is_none() || self.output.is_none() {
            return Err(CameraError::SessionConfiguration(
                "session needs an input and an output to run".to_string(),
            ));
        }
        if self.state == SessionState::Stopped {
            return Err(CameraError::SessionConfiguration(
                "session was stopped before it started".to_string(),
            ));
        }
        self.state = SessionState::Running;
        Ok(())
    }

    pub fn mark_stopped(&mut self) {
        self.state = SessionState::Stopped;
    }
}

/// Session shared between the manager, its queue and the capture coordinator
#[derive(Debug)]
pub struct SessionHandle {
    session: Mutex<CaptureSession>,
    changed: Condvar,
}

/// Shared reference to the current session
pub type SharedSession = Arc<SessionHandle>;

impl SessionHandle {
    pub fn new(session: CaptureSession) -> SharedSession {
        Arc::new(Self {
            session: Mutex::new(session),
            changed: Condvar::new(),
        })
    }

    /// Clone of the current session
    pub fn snapshot(&self) -> CaptureSession {
        lock(&self.session).clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&CaptureSession) -> R) -> R {
        f(&lock(&self.session))
    }

    /// Mutate the session and wake everyone waiting on it
    pub fn update<R>(&self, f: impl FnOnce(&mut CaptureSession) -> R) -> R {
        let result = f(&mut lock(&self.session));
        self.changed.notify_all();
        result
    }

    /// Mutate the session only if it is still the one with `session_id`
    pub fn update_if_current<R>(
        &self,
        session_id: Uuid,
        f: impl FnOnce(&mut CaptureSession) -> R,
    ) -> Option<R> {
        self.update(|session| (session.id() == session_id).then(|| f(session)))
    }

    pub fn replace(&self, session: CaptureSession) {
        self.update(|current| *current = session);
    }

    /// Wait until `pred` holds, giving up after `timeout`
    pub fn wait_until(&self, timeout: Duration, pred: impl Fn(&CaptureSession) -> bool) -> bool {
        let guard = lock(&self.session);
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |session| !pred(session))
            .unwrap_or_else(PoisonError::into_inner);
        pred(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::CameraDevice;

    fn input() -> DeviceInput {
        DeviceInput::new(CameraDevice {
            id: "cam".into(),
            name: "Camera".into(),
            path: "/dev/video0".into(),
            device_info: None,
        })
    }

    #[test]
    fn graph_accepts_one_input_and_one_output() {
        let mut session = CaptureSession::new(SessionPreset::Photo);
        session.add_input(input()).unwrap();
        session.add_output(PhotoOutput::new()).unwrap();

        assert!(session.add_input(input()).is_err());
        assert!(session.add_output(PhotoOutput::new()).is_err());
        assert_eq!(session.input_count(), 1);
        assert_eq!(session.output_count(), 1);
        assert_eq!(session.state(), SessionState::Configuring);
    }

    #[test]
    fn output_is_connected_to_input_in_either_order() {
        let mut session = CaptureSession::new(SessionPreset::Photo);
        session.add_output(PhotoOutput::new()).unwrap();
        let input = input();
        session.add_input(input.clone()).unwrap();
        assert_eq!(session.output().unwrap().connected_input(), Some(&input));
    }

    #[test]
    fn running_session_cannot_be_reconfigured() {
        let mut session = CaptureSession::new(SessionPreset::Photo);
        session.add_input(input()).unwrap();
        session.add_output(PhotoOutput::new()).unwrap();
        session.mark_running().unwrap();

        let err = session.add_output(PhotoOutput::new()).unwrap_err();
        assert!(matches!(err, CameraError::SessionConfiguration(_)));
    }

    #[test]
    fn incomplete_graph_cannot_run() {
        let mut session = CaptureSession::new(SessionPreset::Photo);
        session.add_input(input()).unwrap();
        assert!(session.mark_running().is_err());
    }

    #[test]
    fn stale_updates_are_ignored() {
        let handle = SessionHandle::new(CaptureSession::new(SessionPreset::Photo));
        let old_id = handle.with(|s| s.id());
        handle.replace(CaptureSession::new(SessionPreset::Photo));

        assert!(handle.update_if_current(old_id, |s| s.mark_stopped()).is_none());
        assert_eq!(handle.with(|s| s.state()), SessionState::Uninitialized);
    }

    #[test]
    fn wait_until_times_out() {
        let handle = SessionHandle::new(CaptureSession::new(SessionPreset::Photo));
        assert!(!handle.wait_until(Duration::from_millis(10), |s| s.is_running()));
    }
}
