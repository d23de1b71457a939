//! Purpose: Turn caller-supplied byte strings into NUL-terminated native arguments.
//! Exports: `encode_arg`, `encode_required_arg`.
//! Role: The only place where host strings cross into `CString` form.
//! Invariants: Output is valid UTF-8 with no interior NUL; failures happen before any native call.
use std::ffi::CString;

use crate::core::error::{Error, ErrorKind};

/// Encodes one argument; `name` only labels the error.
pub fn encode_arg(name: &str, value: &[u8]) -> Result<CString, Error> {
    std::str::from_utf8(value).map_err(|err| {
        Error::new(ErrorKind::ParameterEncoding)
            .with_message(format!("{name} is not valid UTF-8"))
            .with_source(err)
    })?;
    CString::new(value).map_err(|err| {
        Error::new(ErrorKind::ParameterEncoding)
            .with_message(format!("{name} contains a NUL byte"))
            .with_source(err)
    })
}

/// Like `encode_arg`, but rejects empty input.
pub fn encode_required_arg(name: &str, value: &[u8]) -> Result<CString, Error> {
    if value.is_empty() {
        return Err(Error::new(ErrorKind::ParameterEncoding)
            .with_message(format!("{name} must not be empty")));
    }
    encode_arg(name, value)
}
