//! Purpose: Library crate behind the `mqbridge` CLI: drive a native message-queue client safely.
//! Exports: `api` (sessions, consume loop, outcomes, errors) and `core` (internals).
//! Role: Wraps the C-ABI producer/consumer library in typed, lifecycle-checked sessions.
//! Invariants: Hosts reach the native library only through `api` sessions.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
