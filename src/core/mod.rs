// Core modules: native boundary, encoding, outcome classification, session lifecycle.
pub mod encode;
pub mod error;
pub mod native;
pub mod outcome;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;
