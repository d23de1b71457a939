//! Purpose: Classify native status codes and sentinel replies into typed outcomes.
//! Exports: `Role`, `InitResult`, `InitStatus`, `InitFailure`, `InitFailureReason`,
//! `SendOutcome`, `PollOutcome`, `classify_init`, `classify_send`, `classify_poll`.
//! Role: Single parsing point for every native result; nothing downstream re-parses.
//! Invariants: Sentinel strings are never surfaced as message bodies.
//! Invariants: Unknown init codes keep their raw value.
use std::fmt;

use crate::core::error::{Error, ErrorKind};

const SEND_SUCCESS_PREFIX: &str = "Success";
const MSG_ID_MARKER: &str = "MsgID=";
const POLL_TIMEOUT: &str = "TIMEOUT";
const POLL_EMPTY: &str = "EMPTY_MESSAGE";
const POLL_ERROR_PREFIX: &str = "Error:";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Producer,
    Consumer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Producer => f.write_str("producer"),
            Role::Consumer => f.write_str("consumer"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InitFailureReason {
    CreateFailed,
    SubscribeFailed,
    StartFailed,
    InvalidParameters,
    Unknown,
}

impl InitFailureReason {
    pub fn describe(self) -> &'static str {
        match self {
            InitFailureReason::CreateFailed => "native client could not be created",
            InitFailureReason::SubscribeFailed => "topic subscription failed",
            InitFailureReason::StartFailed => "native client could not be started",
            InitFailureReason::InvalidParameters => "native library rejected the parameters",
            InitFailureReason::Unknown => "unknown native error",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InitFailure {
    pub code: i32,
    pub reason: InitFailureReason,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InitResult {
    Created,
    AlreadyRunning,
    Failed(InitFailure),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InitStatus {
    Created,
    AlreadyRunning,
}

impl InitResult {
    pub fn into_status(self, role: Role) -> Result<InitStatus, Error> {
        match self {
            InitResult::Created => Ok(InitStatus::Created),
            InitResult::AlreadyRunning => Ok(InitStatus::AlreadyRunning),
            InitResult::Failed(failure) => Err(Error::new(ErrorKind::InitFailed)
                .with_message(format!(
                    "{role} initialization failed: {}",
                    failure.reason.describe()
                ))
                .with_code(failure.code)),
        }
    }
}

pub fn classify_init(role: Role, code: i32) -> InitResult {
    let reason = match (role, code) {
        (_, 0) => return InitResult::Created,
        (_, 1) => return InitResult::AlreadyRunning,
        (_, -1) => InitFailureReason::CreateFailed,
        (Role::Producer, -2) => InitFailureReason::StartFailed,
        (Role::Consumer, -2) => InitFailureReason::SubscribeFailed,
        (Role::Consumer, -3) => InitFailureReason::StartFailed,
        (_, -4) => InitFailureReason::InvalidParameters,
        _ => InitFailureReason::Unknown,
    };
    InitResult::Failed(InitFailure { code, reason })
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SendOutcome {
    pub success: bool,
    pub raw_message: String,
}

impl SendOutcome {
    /// Broker message id from a `Success: MsgID=<id>` reply.
    pub fn message_id(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        let (_, rest) = self.raw_message.split_once(MSG_ID_MARKER)?;
        let id = rest.split_whitespace().next()?;
        (!id.is_empty()).then_some(id)
    }
}

/// Turns a raw native reply into text. Null and non-UTF-8 replies are boundary failures.
pub(crate) fn decode_reply(entry_point: &str, reply: Option<Vec<u8>>) -> Result<String, Error> {
    let bytes = reply.ok_or_else(|| {
        Error::new(ErrorKind::NativeCallFailed).with_message(format!("{entry_point} returned null"))
    })?;
    String::from_utf8(bytes).map_err(|err| {
        Error::new(ErrorKind::NativeCallFailed)
            .with_message(format!("{entry_point} reply is not valid UTF-8"))
            .with_source(err)
    })
}

pub fn classify_send(reply: String) -> SendOutcome {
    SendOutcome {
        success: reply.starts_with(SEND_SUCCESS_PREFIX),
        raw_message: reply,
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    Message(String),
    Timeout,
    Empty,
    Error(String),
}

impl PollOutcome {
    pub fn into_message(self) -> Option<String> {
        match self {
            PollOutcome::Message(body) => Some(body),
            _ => None,
        }
    }

    /// True for the expected "nothing this cycle" results.
    pub fn is_idle(&self) -> bool {
        matches!(self, PollOutcome::Timeout | PollOutcome::Empty)
    }
}

pub fn classify_poll(reply: String) -> PollOutcome {
    match reply.as_str() {
        POLL_TIMEOUT => PollOutcome::Timeout,
        POLL_EMPTY => PollOutcome::Empty,
        text if text.starts_with(POLL_ERROR_PREFIX) => PollOutcome::Error(reply),
        _ => PollOutcome::Message(reply),
    }
}
