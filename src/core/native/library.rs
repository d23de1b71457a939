//! Purpose: Bind the native queue library with `libloading` and call its entry points.
//! Exports: `NativeBinder`, `NativeProducer`, `NativeConsumer`.
//! Role: Production implementation of the boundary traits.
//! Invariants: Every entry point a role needs is resolved at bind time; a missing symbol is `LibraryLoad`.
//! Invariants: The `Library` lives as long as the resolved function pointers.
//! Invariants: All unsafe FFI interaction is confined to this module + `sys`.
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::path::Path;

use libloading::Library;

use super::sys;
use super::{
    Binder, ConsumerEntryPoints, ConsumerParams, EncodedConsumerParams, EncodedProducerParams,
    EntryPoints, ProducerEntryPoints, ProducerParams,
};
use crate::core::error::{Error, ErrorKind};
use crate::core::outcome::Role;

#[derive(Clone, Copy, Debug, Default)]
pub struct NativeBinder;

pub struct NativeProducer {
    initialize_fn: sys::InitializeProducerFn,
    send_message_fn: sys::SendMessageFn,
    shutdown_fn: sys::ShutdownFn,
    free_string_fn: Option<sys::FreeStringFn>,
    _library: Library,
}

pub struct NativeConsumer {
    initialize_fn: sys::InitializeConsumerFn,
    get_next_message_fn: sys::GetNextMessageFn,
    shutdown_fn: sys::ShutdownFn,
    free_string_fn: Option<sys::FreeStringFn>,
    _library: Library,
}

impl Binder<NativeProducer> for NativeBinder {
    fn bind(&self, library_path: &Path) -> Result<NativeProducer, Error> {
        let library = open_library(library_path)?;
        let initialize_fn = resolve(&library, sys::INITIALIZE_PRODUCER, library_path)?;
        let send_message_fn = resolve(&library, sys::SEND_MESSAGE, library_path)?;
        let shutdown_fn = resolve(&library, sys::SHUTDOWN_PRODUCER, library_path)?;
        let free_string_fn = resolve_optional(&library, sys::FREE_STRING);
        Ok(NativeProducer {
            initialize_fn,
            send_message_fn,
            shutdown_fn,
            free_string_fn,
            _library: library,
        })
    }
}

impl Binder<NativeConsumer> for NativeBinder {
    fn bind(&self, library_path: &Path) -> Result<NativeConsumer, Error> {
        let library = open_library(library_path)?;
        let initialize_fn = resolve(&library, sys::INITIALIZE_CONSUMER, library_path)?;
        let get_next_message_fn = resolve(&library, sys::GET_NEXT_MESSAGE, library_path)?;
        let shutdown_fn = resolve(&library, sys::SHUTDOWN_CONSUMER, library_path)?;
        let free_string_fn = resolve_optional(&library, sys::FREE_STRING);
        Ok(NativeConsumer {
            initialize_fn,
            get_next_message_fn,
            shutdown_fn,
            free_string_fn,
            _library: library,
        })
    }
}

impl EntryPoints for NativeProducer {
    type Params = ProducerParams;
    const ROLE: Role = Role::Producer;

    fn initialize(&mut self, params: &EncodedProducerParams) -> c_int {
        unsafe { (self.initialize_fn)(params.name_server.as_ptr(), params.group.as_ptr()) }
    }

    fn shutdown(&mut self) -> c_int {
        unsafe { (self.shutdown_fn)() }
    }
}

impl ProducerEntryPoints for NativeProducer {
    fn send_message(&mut self, topic: &CStr, tag: &CStr, body: &CStr) -> Option<Vec<u8>> {
        unsafe {
            let reply = (self.send_message_fn)(topic.as_ptr(), tag.as_ptr(), body.as_ptr());
            take_reply(reply, self.free_string_fn)
        }
    }
}

impl EntryPoints for NativeConsumer {
    type Params = ConsumerParams;
    const ROLE: Role = Role::Consumer;

    fn initialize(&mut self, params: &EncodedConsumerParams) -> c_int {
        unsafe {
            (self.initialize_fn)(
                params.name_server.as_ptr(),
                params.topic.as_ptr(),
                params.group.as_ptr(),
                params.tag.as_ptr(),
            )
        }
    }

    fn shutdown(&mut self) -> c_int {
        unsafe { (self.shutdown_fn)() }
    }
}

impl ConsumerEntryPoints for NativeConsumer {
    fn get_next_message(&mut self, timeout_ms: c_int) -> Option<Vec<u8>> {
        unsafe {
            let reply = (self.get_next_message_fn)(timeout_ms);
            take_reply(reply, self.free_string_fn)
        }
    }
}

fn open_library(path: &Path) -> Result<Library, Error> {
    if !path.exists() {
        return Err(Error::new(ErrorKind::LibraryNotFound)
            .with_message("native library not found")
            .with_path(path));
    }
    tracing::debug!(library = %path.display(), "loading native library");
    unsafe { Library::new(path) }.map_err(|err| {
        Error::new(ErrorKind::LibraryLoad)
            .with_message("failed to load native library")
            .with_path(path)
            .with_source(err)
    })
}

fn resolve<T: Copy>(library: &Library, symbol: &[u8], path: &Path) -> Result<T, Error> {
    let bound = unsafe { library.get::<T>(symbol) }.map_err(|err| {
        Error::new(ErrorKind::LibraryLoad)
            .with_message(format!("missing entry point {}", symbol_name(symbol)))
            .with_path(path)
            .with_source(err)
    })?;
    Ok(*bound)
}

fn resolve_optional<T: Copy>(library: &Library, symbol: &[u8]) -> Option<T> {
    unsafe { library.get::<T>(symbol) }.ok().map(|bound| *bound)
}

fn symbol_name(symbol: &[u8]) -> String {
    String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned()
}

/// Copies a native reply into an owned buffer, then hands the pointer back to the library.
///
/// # Safety
/// `reply` must be null or point to a NUL-terminated string that stays valid until freed.
unsafe fn take_reply(
    reply: *mut c_char,
    free_string_fn: Option<sys::FreeStringFn>,
) -> Option<Vec<u8>> {
    if reply.is_null() {
        return None;
    }
    let bytes = unsafe { CStr::from_ptr(reply) }.to_bytes().to_vec();
    if let Some(free_string_fn) = free_string_fn {
        unsafe { free_string_fn(reply) };
    }
    Some(bytes)
}
