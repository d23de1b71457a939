//! Purpose: Define the public Rust API of the bridge.
//! Exports: Sessions, the consume loop, boundary traits, outcomes and errors.
//! Role: Public, additive-only surface; hosts and the CLI go through this module.
//! Invariants: Sentinel parsing and unsafe FFI stay behind this boundary.

mod consume_loop;
mod consumer;
mod producer;

pub use crate::core::error::{Error, ErrorKind, to_exit_code};
pub use crate::core::native::{
    Binder, ConsumerEntryPoints, ConsumerParams, EncodedConsumerParams, EncodedProducerParams,
    EntryPoints, InitParams, NativeBinder, NativeConsumer, NativeProducer, ProducerEntryPoints,
    ProducerParams,
};
pub use crate::core::outcome::{
    InitFailure, InitFailureReason, InitResult, InitStatus, PollOutcome, Role, SendOutcome,
    classify_init, classify_poll, classify_send,
};
pub use crate::core::session::{SessionHandle, SessionState};
pub use consume_loop::{ConsumeLoop, ConsumeOptions, ConsumeStats};
pub use consumer::ConsumerSession;
pub use producer::ProducerSession;
