//! Purpose: Own one native binding and drive its lifecycle state machine.
//! Exports: `SessionHandle`, `SessionState`.
//! Role: Shared core of producer and consumer sessions.
//! Invariants: Only `load`/`initialize` run before `Ready`; everything else gets `NotInitialized`.
//! Invariants: The library is bound at most once per handle.
//! Invariants: `shutdown` always leaves the handle `Closed`, even when the native call fails.
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::native::{Binder, EntryPoints, InitParams};
use crate::core::outcome::{InitStatus, Role, classify_init};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
    Unloaded,
    Loaded,
    Ready,
    ShuttingDown,
    Closed,
}

pub struct SessionHandle<E: EntryPoints, B: Binder<E>> {
    library_path: PathBuf,
    binder: B,
    entry_points: Option<E>,
    state: SessionState,
}

impl<E: EntryPoints, B: Binder<E>> SessionHandle<E, B> {
    pub fn new(library_path: impl Into<PathBuf>, binder: B) -> Self {
        Self {
            library_path: library_path.into(),
            binder,
            entry_points: None,
            state: SessionState::Unloaded,
        }
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn role(&self) -> Role {
        E::ROLE
    }

    pub fn load(&mut self) -> Result<(), Error> {
        match self.state {
            SessionState::Unloaded => {}
            SessionState::Closed => return Err(closed_error(E::ROLE)),
            _ => return Ok(()),
        }
        let entry_points = self.binder.bind(&self.library_path)?;
        self.entry_points = Some(entry_points);
        self.state = SessionState::Loaded;
        debug!(role = %E::ROLE, library = %self.library_path.display(), "native library bound");
        Ok(())
    }

    /// Brings the session to `Ready`. Parameters are encoded before the library is touched.
    pub fn initialize(&mut self, params: &E::Params) -> Result<InitStatus, Error> {
        match self.state {
            SessionState::Closed => return Err(closed_error(E::ROLE)),
            SessionState::Ready => {
                debug!(role = %E::ROLE, "initialize on ready session; skipping native call");
                return Ok(InitStatus::AlreadyRunning);
            }
            _ => {}
        }

        let encoded = params.encode()?;
        self.load()?;
        let entry_points = self.entry_points.as_mut().ok_or_else(missing_binding)?;
        let code = entry_points.initialize(&encoded);
        let status = classify_init(E::ROLE, code).into_status(E::ROLE)?;
        self.state = SessionState::Ready;
        debug!(role = %E::ROLE, ?status, "session ready");
        Ok(status)
    }

    /// Entry points of a `Ready` session.
    pub(crate) fn ready_entry_points(&mut self) -> Result<&mut E, Error> {
        match self.state {
            SessionState::Ready => self.entry_points.as_mut().ok_or_else(missing_binding),
            SessionState::Closed => Err(closed_error(E::ROLE)),
            _ => Err(Error::new(ErrorKind::NotInitialized)
                .with_message(format!("{} is not initialized", E::ROLE))),
        }
    }

    pub fn shutdown(&mut self) -> Result<(), Error> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Closed => return Ok(()),
            _ => {
                self.release();
                return Ok(());
            }
        }

        self.state = SessionState::ShuttingDown;
        let code = self
            .entry_points
            .as_mut()
            .map(|entry_points| entry_points.shutdown())
            .ok_or_else(missing_binding);
        self.release();
        let code = code?;
        if code != 0 {
            warn!(role = %E::ROLE, code, "native shutdown failed; session closed anyway");
            return Err(Error::new(ErrorKind::ShutdownFailed)
                .with_message(format!("{} shutdown failed", E::ROLE))
                .with_code(code));
        }
        debug!(role = %E::ROLE, "session closed");
        Ok(())
    }

    fn release(&mut self) {
        self.entry_points = None;
        self.state = SessionState::Closed;
    }
}

impl<E: EntryPoints, B: Binder<E>> Drop for SessionHandle<E, B> {
    fn drop(&mut self) {
        if self.state != SessionState::Ready {
            return;
        }
        if let Err(err) = self.shutdown() {
            warn!(role = %E::ROLE, error = %err, "shutdown on drop failed");
        }
    }
}

fn closed_error(role: Role) -> Error {
    Error::new(ErrorKind::SessionClosed).with_message(format!("{role} session is closed"))
}

fn missing_binding() -> Error {
    Error::new(ErrorKind::Internal).with_message("session has no bound entry points")
}
