// Raw C-ABI signatures and exported symbol names of the native queue library.
use std::os::raw::{c_char, c_int};

pub type InitializeProducerFn =
    unsafe extern "C" fn(name_server: *const c_char, group: *const c_char) -> c_int;

pub type InitializeConsumerFn = unsafe extern "C" fn(
    name_server: *const c_char,
    topic: *const c_char,
    group: *const c_char,
    tag: *const c_char,
) -> c_int;

pub type SendMessageFn = unsafe extern "C" fn(
    topic: *const c_char,
    tag: *const c_char,
    body: *const c_char,
) -> *mut c_char;

pub type GetNextMessageFn = unsafe extern "C" fn(timeout_ms: c_int) -> *mut c_char;

pub type ShutdownFn = unsafe extern "C" fn() -> c_int;

pub type FreeStringFn = unsafe extern "C" fn(ptr: *mut c_char);

pub const INITIALIZE_PRODUCER: &[u8] = b"InitializeProducer\0";
pub const INITIALIZE_CONSUMER: &[u8] = b"InitializeConsumer\0";
pub const SEND_MESSAGE: &[u8] = b"SendMessage\0";
pub const GET_NEXT_MESSAGE: &[u8] = b"GetNextMessage\0";
pub const SHUTDOWN_PRODUCER: &[u8] = b"ShutdownProducer\0";
pub const SHUTDOWN_CONSUMER: &[u8] = b"ShutdownConsumer\0";
pub const FREE_STRING: &[u8] = b"FreeString\0";
