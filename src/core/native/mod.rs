//! Purpose: Define the foreign-call boundary as substitutable traits plus typed init parameters.
//! Exports: `EntryPoints`, `ProducerEntryPoints`, `ConsumerEntryPoints`, `Binder`,
//! `InitParams`, `ProducerParams`, `ConsumerParams`, `NativeBinder`, `NativeProducer`, `NativeConsumer`.
//! Role: Sessions talk to the native library only through these traits; tests plug in fakes.
//! Invariants: A `None` reply means the native call returned null.
//! Invariants: Reply bytes are owned copies; no native pointer outlives a call.
use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::path::Path;

use crate::core::encode::encode_required_arg;
use crate::core::error::Error;
use crate::core::outcome::Role;

mod library;
pub mod sys;

pub use library::{NativeBinder, NativeConsumer, NativeProducer};

pub trait InitParams {
    type Encoded;

    fn encode(&self) -> Result<Self::Encoded, Error>;
}

/// Entry points shared by both roles.
pub trait EntryPoints {
    type Params: InitParams;
    const ROLE: Role;

    fn initialize(&mut self, params: &<Self::Params as InitParams>::Encoded) -> c_int;
    fn shutdown(&mut self) -> c_int;
}

pub trait ProducerEntryPoints: EntryPoints<Params = ProducerParams> {
    fn send_message(&mut self, topic: &CStr, tag: &CStr, body: &CStr) -> Option<Vec<u8>>;
}

pub trait ConsumerEntryPoints: EntryPoints<Params = ConsumerParams> {
    fn get_next_message(&mut self, timeout_ms: c_int) -> Option<Vec<u8>>;
}

/// Produces bound entry points for a library path. Called at most once per session.
pub trait Binder<E> {
    fn bind(&self, library_path: &Path) -> Result<E, Error>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProducerParams {
    pub name_server: Vec<u8>,
    pub group: Vec<u8>,
}

impl ProducerParams {
    pub fn new(name_server: impl Into<Vec<u8>>, group: impl Into<Vec<u8>>) -> Self {
        Self {
            name_server: name_server.into(),
            group: group.into(),
        }
    }
}

#[derive(Debug)]
pub struct EncodedProducerParams {
    pub name_server: CString,
    pub group: CString,
}

impl InitParams for ProducerParams {
    type Encoded = EncodedProducerParams;

    fn encode(&self) -> Result<Self::Encoded, Error> {
        Ok(EncodedProducerParams {
            name_server: encode_required_arg("name_server", &self.name_server)?,
            group: encode_required_arg("group", &self.group)?,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConsumerParams {
    pub name_server: Vec<u8>,
    pub topic: Vec<u8>,
    pub group: Vec<u8>,
    pub tag: Vec<u8>,
}

impl ConsumerParams {
    pub fn new(
        name_server: impl Into<Vec<u8>>,
        topic: impl Into<Vec<u8>>,
        group: impl Into<Vec<u8>>,
        tag: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name_server: name_server.into(),
            topic: topic.into(),
            group: group.into(),
            tag: tag.into(),
        }
    }
}

#[derive(Debug)]
pub struct EncodedConsumerParams {
    pub name_server: CString,
    pub topic: CString,
    pub group: CString,
    pub tag: CString,
}

impl InitParams for ConsumerParams {
    type Encoded = EncodedConsumerParams;

    fn encode(&self) -> Result<Self::Encoded, Error> {
        Ok(EncodedConsumerParams {
            name_server: encode_required_arg("name_server", &self.name_server)?,
            topic: encode_required_arg("topic", &self.topic)?,
            group: encode_required_arg("group", &self.group)?,
            tag: encode_required_arg("tag", &self.tag)?,
        })
    }
}
