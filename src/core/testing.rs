// Scripted in-memory boundary used by unit tests across the crate.
use std::collections::VecDeque;
use std::ffi::CStr;
use std::os::raw::c_int;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::core::error::{Error, ErrorKind};
use crate::core::native::{
    Binder, ConsumerEntryPoints, ConsumerParams, EncodedConsumerParams, EncodedProducerParams,
    EntryPoints, ProducerEntryPoints, ProducerParams,
};
use crate::core::outcome::Role;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum Call {
    Bind,
    Initialize(Vec<String>),
    Send {
        topic: String,
        tag: String,
        body: String,
    },
    Poll(c_int),
    Shutdown,
}

impl Call {
    fn is_native(&self) -> bool {
        !matches!(self, Call::Bind)
    }
}

#[derive(Default)]
struct Script {
    bind_error: Option<ErrorKind>,
    init_codes: VecDeque<c_int>,
    replies: VecDeque<Option<Vec<u8>>>,
    shutdown_codes: VecDeque<c_int>,
    calls: Vec<Call>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeBinder {
    script: Arc<Mutex<Script>>,
}

impl FakeBinder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_init_codes(self, codes: impl IntoIterator<Item = c_int>) -> Self {
        self.script.lock().expect("lock").init_codes.extend(codes);
        self
    }

    pub(crate) fn with_replies<'a>(self, replies: impl IntoIterator<Item = &'a str>) -> Self {
        self.script
            .lock()
            .expect("lock")
            .replies
            .extend(replies.into_iter().map(|reply| Some(reply.as_bytes().to_vec())));
        self
    }

    pub(crate) fn with_raw_reply(self, reply: Option<Vec<u8>>) -> Self {
        self.script.lock().expect("lock").replies.push_back(reply);
        self
    }

    pub(crate) fn with_shutdown_codes(self, codes: impl IntoIterator<Item = c_int>) -> Self {
        self.script.lock().expect("lock").shutdown_codes.extend(codes);
        self
    }

    pub(crate) fn failing_bind(self, kind: ErrorKind) -> Self {
        self.script.lock().expect("lock").bind_error = Some(kind);
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.script.lock().expect("lock").calls.clone()
    }

    pub(crate) fn native_calls(&self) -> usize {
        self.calls().iter().filter(|call| call.is_native()).count()
    }

    fn bind_fake(&self, library_path: &Path) -> Result<Arc<Mutex<Script>>, Error> {
        let mut script = self.script.lock().expect("lock");
        if let Some(kind) = script.bind_error {
            return Err(Error::new(kind)
                .with_message("scripted bind failure")
                .with_path(library_path));
        }
        script.calls.push(Call::Bind);
        Ok(self.script.clone())
    }
}

fn text(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

fn record(script: &Arc<Mutex<Script>>, call: Call) -> std::sync::MutexGuard<'_, Script> {
    let mut guard = script.lock().expect("lock");
    guard.calls.push(call);
    guard
}

pub(crate) struct FakeProducer {
    script: Arc<Mutex<Script>>,
}

pub(crate) struct FakeConsumer {
    script: Arc<Mutex<Script>>,
}

impl Binder<FakeProducer> for FakeBinder {
    fn bind(&self, library_path: &Path) -> Result<FakeProducer, Error> {
        Ok(FakeProducer {
            script: self.bind_fake(library_path)?,
        })
    }
}

impl Binder<FakeConsumer> for FakeBinder {
    fn bind(&self, library_path: &Path) -> Result<FakeConsumer, Error> {
        Ok(FakeConsumer {
            script: self.bind_fake(library_path)?,
        })
    }
}

impl EntryPoints for FakeProducer {
    type Params = ProducerParams;
    const ROLE: Role = Role::Producer;

    fn initialize(&mut self, params: &EncodedProducerParams) -> c_int {
        let args = vec![text(&params.name_server), text(&params.group)];
        let mut script = record(&self.script, Call::Initialize(args));
        script.init_codes.pop_front().unwrap_or(0)
    }

    fn shutdown(&mut self) -> c_int {
        let mut script = record(&self.script, Call::Shutdown);
        script.shutdown_codes.pop_front().unwrap_or(0)
    }
}

impl ProducerEntryPoints for FakeProducer {
    fn send_message(&mut self, topic: &CStr, tag: &CStr, body: &CStr) -> Option<Vec<u8>> {
        let call = Call::Send {
            topic: text(topic),
            tag: text(tag),
            body: text(body),
        };
        let mut script = record(&self.script, call);
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Some(b"Success: MsgID=FAKE0001".to_vec()))
    }
}

impl EntryPoints for FakeConsumer {
    type Params = ConsumerParams;
    const ROLE: Role = Role::Consumer;

    fn initialize(&mut self, params: &EncodedConsumerParams) -> c_int {
        let args = vec![
            text(&params.name_server),
            text(&params.topic),
            text(&params.group),
            text(&params.tag),
        ];
        let mut script = record(&self.script, Call::Initialize(args));
        script.init_codes.pop_front().unwrap_or(0)
    }

    fn shutdown(&mut self) -> c_int {
        let mut script = record(&self.script, Call::Shutdown);
        script.shutdown_codes.pop_front().unwrap_or(0)
    }
}

impl ConsumerEntryPoints for FakeConsumer {
    fn get_next_message(&mut self, timeout_ms: c_int) -> Option<Vec<u8>> {
        let mut script = record(&self.script, Call::Poll(timeout_ms));
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Some(b"TIMEOUT".to_vec()))
    }
}
