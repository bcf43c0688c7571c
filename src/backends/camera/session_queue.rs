// SPDX-License-Identifier: GPL-3.0-only

//! Serial queue for session work
//!
//! Starting and stopping the hardware, settling the active format and
//! submitting captures all run on one dedicated thread, in submission order,
//! never on the caller's thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Unit of work executed on the queue thread
pub type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

/// Cloneable handle for submitting work to a [`SessionQueue`]
#[derive(Clone)]
pub struct QueueHandle {
    sender: Sender<Message>,
}

impl QueueHandle {
    /// Queue a job; the job is handed back if the queue has shut down
    pub fn dispatch(&self, job: Job) -> Result<(), Job> {
        self.sender.send(Message::Run(job)).map_err(|err| match err.0 {
            Message::Run(job) => job,
            Message::Shutdown => Box::new(|| {}),
        })
    }

    /// Queue a job, running it on a one-off thread if the queue is gone
    pub fn dispatch_or_spawn(&self, job: Job) {
        if let Err(job) = self.dispatch(job) {
            warn!("Session queue closed, running job on a detached thread");
            thread::spawn(job);
        }
    }

    /// Wait until everything queued before this call has run
    pub fn flush(&self, timeout: Duration) -> bool {
        let (done_tx, done_rx) = mpsc::channel();
        let marker: Job = Box::new(move || {
            let _ = done_tx.send(());
        });
        if self.dispatch(marker).is_err() {
            return false;
        }
        done_rx.recv_timeout(timeout).is_ok()
    }
}

impl std::fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueHandle").finish_non_exhaustive()
    }
}

/// Owner of the queue thread
///
/// Dropping the queue runs every job already submitted, then joins the
/// thread. A job that panics is logged and the queue keeps going.
pub struct SessionQueue {
    handle: QueueHandle,
    thread_handle: Option<JoinHandle<()>>,
    name: String,
}

impl SessionQueue {
    /// Spawn the queue thread
    pub fn start(name: &str) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let name_clone = name.to_string();

        info!(name = %name, "Starting session queue");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_queue(&name_clone, receiver))?;

        Ok(Self {
            handle: QueueHandle { sender },
            thread_handle: Some(thread_handle),
            name: name.to_string(),
        })
    }

    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    pub fn dispatch(&self, job: Job) -> Result<(), Job> {
        self.handle.dispatch(job)
    }

    pub fn flush(&self, timeout: Duration) -> bool {
        self.handle.flush(timeout)
    }

    /// Drain outstanding jobs and join the thread
    pub fn stop(&mut self) {
        let Some(thread_handle) = self.thread_handle.take() else {
            return;
        };

        debug!(name = %self.name, "Stopping session queue");
        let _ = self.handle.sender.send(Message::Shutdown);

        // A job dropping the last owner of the queue runs on the queue itself
        if thread::current().id() == thread_handle.thread().id() {
            return;
        }
        if thread_handle.join().is_err() {
            warn!(name = %self.name, "Session queue thread panicked");
        }
    }

}

impl Drop for SessionQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_queue(name: &str, receiver: Receiver<Message>) {
    debug!(name, "Session queue thread started");
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => run_job(name, job),
            Message::Shutdown => break,
        }
    }
    // Jobs that raced the shutdown still run
    while let Ok(Message::Run(job)) = receiver.try_recv() {
        run_job(name, job);
    }
    debug!(name, "Session queue thread exited");
}

/// Run one job; a panicking job must not take the queue thread down with it
fn run_job(name: &str, job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(name, reason = %reason, "Session queue job panicked");
    }
}
