//! Purpose: Consumer-side session: subscribe, poll for the next message, shut down.
//! Exports: `ConsumerSession`.
//! Role: Host-facing wrapper over `SessionHandle` for the consumer entry points.
//! Invariants: Timeout/empty polls are values, never errors, and are only traced.
//! Invariants: The bridge runs no timer of its own; the native call enforces the timeout.
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::trace;

use crate::core::error::{Error, ErrorKind};
use crate::core::native::{
    Binder, ConsumerEntryPoints, ConsumerParams, NativeBinder, NativeConsumer,
};
use crate::core::outcome::{InitStatus, PollOutcome, classify_poll, decode_reply};
use crate::core::session::{SessionHandle, SessionState};

pub struct ConsumerSession<E: ConsumerEntryPoints = NativeConsumer, B: Binder<E> = NativeBinder> {
    handle: SessionHandle<E, B>,
}

impl ConsumerSession {
    pub fn new(library_path: impl Into<PathBuf>) -> Self {
        Self::with_binder(library_path, NativeBinder)
    }
}

impl<E: ConsumerEntryPoints, B: Binder<E>> ConsumerSession<E, B> {
    pub fn with_binder(library_path: impl Into<PathBuf>, binder: B) -> Self {
        Self {
            handle: SessionHandle::new(library_path, binder),
        }
    }

    pub fn state(&self) -> SessionState {
        self.handle.state()
    }

    pub fn library_path(&self) -> &Path {
        self.handle.library_path()
    }

    pub fn load(&mut self) -> Result<(), Error> {
        self.handle.load()
    }

    pub fn initialize(&mut self, params: &ConsumerParams) -> Result<InitStatus, Error> {
        self.handle.initialize(params)
    }

    /// Waits up to `timeout` for the next message.
    ///
    /// A zero timeout lets the native library apply its own default wait.
    pub fn poll_next(&mut self, timeout: Duration) -> Result<PollOutcome, Error> {
        let entry_points = self.handle.ready_entry_points()?;
        let timeout_ms = timeout_millis(timeout)?;

        let reply = entry_points.get_next_message(timeout_ms);
        let outcome = classify_poll(decode_reply("GetNextMessage", reply)?);
        match &outcome {
            PollOutcome::Message(body) => trace!(bytes = body.len(), "message received"),
            PollOutcome::Timeout => trace!(timeout_ms, "poll timed out"),
            PollOutcome::Empty => trace!("poll returned empty message"),
            PollOutcome::Error(detail) => trace!(%detail, "poll returned error"),
        }
        Ok(outcome)
    }

    pub fn shutdown(&mut self) -> Result<(), Error> {
        self.handle.shutdown()
    }
}

fn timeout_millis(timeout: Duration) -> Result<c_int, Error> {
    c_int::try_from(timeout.as_millis()).map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("poll timeout {timeout:?} exceeds the native range"))
    })
}
