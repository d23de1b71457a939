//! Purpose: Producer-side session: initialize against a name server, send messages, shut down.
//! Exports: `ProducerSession`.
//! Role: Host-facing wrapper over `SessionHandle` for the producer entry points.
//! Invariants: `send` never reaches the native library unless the session is `Ready`
//! and every argument encoded cleanly.
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::encode::encode_arg;
use crate::core::error::Error;
use crate::core::native::{
    Binder, NativeBinder, NativeProducer, ProducerEntryPoints, ProducerParams,
};
use crate::core::outcome::{InitStatus, SendOutcome, classify_send, decode_reply};
use crate::core::session::{SessionHandle, SessionState};

pub struct ProducerSession<E: ProducerEntryPoints = NativeProducer, B: Binder<E> = NativeBinder> {
    handle: SessionHandle<E, B>,
}

impl ProducerSession {
    /// Producer backed by the native library at `library_path`. Nothing is loaded yet.
    pub fn new(library_path: impl Into<PathBuf>) -> Self {
        Self::with_binder(library_path, NativeBinder)
    }
}

impl<E: ProducerEntryPoints, B: Binder<E>> ProducerSession<E, B> {
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

    pub fn initialize(&mut self, params: &ProducerParams) -> Result<InitStatus, Error> {
        self.handle.initialize(params)
    }

    /// Sends one message. A declined send is `Ok` with `success == false`.
    pub fn send(
        &mut self,
        topic: impl AsRef<[u8]>,
        tag: impl AsRef<[u8]>,
        body: impl AsRef<[u8]>,
    ) -> Result<SendOutcome, Error> {
        let entry_points = self.handle.ready_entry_points()?;
        let topic = encode_arg("topic", topic.as_ref())?;
        let tag = encode_arg("tag", tag.as_ref())?;
        let body = encode_arg("body", body.as_ref())?;

        let reply = entry_points.send_message(&topic, &tag, &body);
        let outcome = classify_send(decode_reply("SendMessage", reply)?);
        if outcome.success {
            debug!(topic = %topic.to_string_lossy(), reply = %outcome.raw_message, "message sent");
        } else {
            debug!(topic = %topic.to_string_lossy(), reply = %outcome.raw_message, "send declined");
        }
        Ok(outcome)
    }

    pub fn shutdown(&mut self) -> Result<(), Error> {
        self.handle.shutdown()
    }
}
