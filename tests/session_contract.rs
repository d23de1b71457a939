// Lifecycle and consume-loop contract exercised through the public API with a scripted boundary.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::CStr;
use std::os::raw::c_int;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mqbridge::api::{
    Binder, ConsumeLoop, ConsumeOptions, ConsumerEntryPoints, ConsumerParams, ConsumerSession,
    EncodedConsumerParams, EncodedProducerParams, EntryPoints, Error, ErrorKind, InitStatus,
    ProducerEntryPoints, ProducerParams, ProducerSession, Role, SessionState,
};

#[derive(Default)]
struct Log {
    binds: usize,
    inits: usize,
    sends: Vec<String>,
    polls: usize,
    shutdowns: usize,
    replies: VecDeque<&'static str>,
    init_code: c_int,
}

type Shared = Rc<RefCell<Log>>;

#[derive(Clone, Default)]
struct Scripted {
    log: Shared,
}

impl Scripted {
    fn with_replies(replies: &[&'static str]) -> Self {
        let scripted = Self::default();
        scripted.log.borrow_mut().replies.extend(replies.iter().copied());
        scripted
    }

    fn with_init_code(code: c_int) -> Self {
        let scripted = Self::default();
        scripted.log.borrow_mut().init_code = code;
        scripted
    }
}

struct Producer(Shared);
struct Consumer(Shared);

impl Binder<Producer> for Scripted {
    fn bind(&self, _library_path: &Path) -> Result<Producer, Error> {
        self.log.borrow_mut().binds += 1;
        Ok(Producer(self.log.clone()))
    }
}

impl Binder<Consumer> for Scripted {
    fn bind(&self, _library_path: &Path) -> Result<Consumer, Error> {
        self.log.borrow_mut().binds += 1;
        Ok(Consumer(self.log.clone()))
    }
}

impl EntryPoints for Producer {
    type Params = ProducerParams;
    const ROLE: Role = Role::Producer;

    fn initialize(&mut self, _params: &EncodedProducerParams) -> c_int {
        let mut log = self.0.borrow_mut();
        log.inits += 1;
        log.init_code
    }

    fn shutdown(&mut self) -> c_int {
        self.0.borrow_mut().shutdowns += 1;
        0
    }
}

impl ProducerEntryPoints for Producer {
    fn send_message(&mut self, _topic: &CStr, _tag: &CStr, body: &CStr) -> Option<Vec<u8>> {
        let body = body.to_string_lossy().into_owned();
        self.0.borrow_mut().sends.push(body);
        Some(b"Success: MsgID=0A0B0C".to_vec())
    }
}

impl EntryPoints for Consumer {
    type Params = ConsumerParams;
    const ROLE: Role = Role::Consumer;

    fn initialize(&mut self, _params: &EncodedConsumerParams) -> c_int {
        let mut log = self.0.borrow_mut();
        log.inits += 1;
        log.init_code
    }

    fn shutdown(&mut self) -> c_int {
        self.0.borrow_mut().shutdowns += 1;
        0
    }
}

impl ConsumerEntryPoints for Consumer {
    fn get_next_message(&mut self, _timeout_ms: c_int) -> Option<Vec<u8>> {
        let mut log = self.0.borrow_mut();
        log.polls += 1;
        let reply = log.replies.pop_front().unwrap_or("TIMEOUT");
        Some(reply.as_bytes().to_vec())
    }
}

const LIB: &str = "/opt/mq/librocketmq_service.so";

fn producer_params() -> ProducerParams {
    ProducerParams::new("127.0.0.1:9876", "task_group")
}

fn consumer_params() -> ConsumerParams {
    ConsumerParams::new("127.0.0.1:9876", "task_topic", "task_group", "*")
}

#[test]
fn producer_full_lifecycle() {
    let scripted = Scripted::default();
    let mut producer: ProducerSession<Producer, Scripted> =
        ProducerSession::with_binder(LIB, scripted.clone());
    assert_eq!(producer.state(), SessionState::Unloaded);

    assert_eq!(
        producer.initialize(&producer_params()).expect("init"),
        InitStatus::Created
    );
    assert_eq!(producer.state(), SessionState::Ready);

    let outcome = producer.send("task_topic", "", "hello").expect("send");
    assert!(outcome.success);
    assert_eq!(outcome.message_id(), Some("0A0B0C"));

    producer.shutdown().expect("shutdown");
    assert_eq!(producer.state(), SessionState::Closed);

    let err = producer.send("task_topic", "", "late").expect_err("closed");
    assert_eq!(err.kind(), ErrorKind::SessionClosed);

    let log = scripted.log.borrow();
    assert_eq!(log.binds, 1);
    assert_eq!(log.sends, vec!["hello".to_string()]);
    assert_eq!(log.shutdowns, 1);
}

#[test]
fn second_initialize_reports_already_running_without_native_call() {
    let scripted = Scripted::default();
    let mut consumer: ConsumerSession<Consumer, Scripted> =
        ConsumerSession::with_binder(LIB, scripted.clone());

    assert_eq!(
        consumer.initialize(&consumer_params()).expect("first"),
        InitStatus::Created
    );
    assert_eq!(
        consumer.initialize(&consumer_params()).expect("second"),
        InitStatus::AlreadyRunning
    );
    assert_eq!(scripted.log.borrow().inits, 1);
}

#[test]
fn failed_subscription_leaves_session_loaded() {
    let scripted = Scripted::with_init_code(-2);
    let mut consumer: ConsumerSession<Consumer, Scripted> =
        ConsumerSession::with_binder(LIB, scripted.clone());

    let err = consumer.initialize(&consumer_params()).expect_err("init");
    assert_eq!(err.kind(), ErrorKind::InitFailed);
    assert_eq!(err.code(), Some(-2));
    assert_eq!(consumer.state(), SessionState::Loaded);

    let err = consumer.poll_next(Duration::from_millis(10)).expect_err("poll");
    assert_eq!(err.kind(), ErrorKind::NotInitialized);
    assert_eq!(scripted.log.borrow().polls, 0);
}

#[test]
fn consume_loop_delivers_payloads_in_order() {
    let scripted = Scripted::with_replies(&[
        "EMPTY_MESSAGE",
        "EMPTY_MESSAGE",
        "payload-1",
        "TIMEOUT",
        "payload-2",
    ]);
    let mut consumer: ConsumerSession<Consumer, Scripted> =
        ConsumerSession::with_binder(LIB, scripted.clone());
    consumer.initialize(&consumer_params()).expect("init");

    let options = ConsumeOptions {
        idle_interval: Duration::ZERO,
        max_messages: Some(2),
        ..ConsumeOptions::default()
    };
    let stop = AtomicBool::new(false);
    let mut seen = Vec::new();
    let stats = ConsumeLoop::new(options)
        .run(&mut consumer, |body| seen.push(body.to_string()), &stop)
        .expect("run");

    assert_eq!(seen, vec!["payload-1".to_string(), "payload-2".to_string()]);
    assert_eq!(stats.polls, 5);
    assert_eq!(stats.idle, 3);
    assert!(!stop.load(Ordering::Acquire));
}

#[test]
fn dropping_a_ready_session_shuts_it_down() {
    let scripted = Scripted::default();
    {
        let mut producer: ProducerSession<Producer, Scripted> =
            ProducerSession::with_binder(LIB, scripted.clone());
        producer.initialize(&producer_params()).expect("init");
    }
    assert_eq!(scripted.log.borrow().shutdowns, 1);
}
