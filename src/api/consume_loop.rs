//! Purpose: Long-running consume cycle on top of `ConsumerSession::poll_next`.
//! Exports: `ConsumeLoop`, `ConsumeOptions`, `ConsumeStats`.
//! Role: Dispatches message bodies to a handler; paces idle and failing polls.
//! Invariants: A single failed poll never ends the loop; only sequencing/usage errors do.
//! Invariants: Stop is cooperative and checked after each poll returns.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use super::consumer::ConsumerSession;
use crate::core::error::{Error, ErrorKind};
use crate::core::native::{Binder, ConsumerEntryPoints};
use crate::core::outcome::PollOutcome;

const MAX_BACKOFF_DOUBLINGS: u32 = 16;

#[derive(Clone, Debug)]
pub struct ConsumeOptions {
    pub poll_timeout: Duration,
    pub idle_interval: Duration,
    pub error_backoff: Duration,
    pub max_error_backoff: Duration,
    pub max_messages: Option<u64>,
}

impl ConsumeOptions {
    pub fn new() -> Self {
        Self {
            poll_timeout: Duration::from_millis(5000),
            idle_interval: Duration::from_millis(100),
            error_backoff: Duration::from_millis(250),
            max_error_backoff: Duration::from_secs(5),
            max_messages: None,
        }
    }
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConsumeStats {
    pub polls: u64,
    pub delivered: u64,
    pub idle: u64,
    pub errors: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ConsumeLoop {
    options: ConsumeOptions,
}

impl ConsumeLoop {
    pub fn new(options: ConsumeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConsumeOptions {
        &self.options
    }

    /// Polls until `stop` is set or the message budget is spent.
    ///
    /// An in-flight poll always runs to completion, so stop latency is bounded by
    /// `poll_timeout`.
    pub fn run<E, B, H>(
        &self,
        session: &mut ConsumerSession<E, B>,
        mut handler: H,
        stop: &AtomicBool,
    ) -> Result<ConsumeStats, Error>
    where
        E: ConsumerEntryPoints,
        B: Binder<E>,
        H: FnMut(&str),
    {
        let mut stats = ConsumeStats::default();
        let mut consecutive_errors: u32 = 0;

        while !stop.load(Ordering::Acquire) && !self.budget_spent(&stats) {
            stats.polls += 1;
            let polled = match session.poll_next(self.options.poll_timeout) {
                Ok(outcome) => outcome,
                Err(err) if err.kind() == ErrorKind::NativeCallFailed => {
                    PollOutcome::Error(err.to_string())
                }
                Err(err) => return Err(err),
            };
            let pause = self.pause_after(&polled, &mut consecutive_errors);
            match polled {
                PollOutcome::Message(body) => {
                    stats.delivered += 1;
                    handler(&body);
                }
                PollOutcome::Timeout | PollOutcome::Empty => stats.idle += 1,
                PollOutcome::Error(detail) => {
                    stats.errors += 1;
                    warn!(%detail, consecutive_errors, "poll reported an error");
                }
            }

            if !pause.is_zero() && !stop.load(Ordering::Acquire) {
                std::thread::sleep(pause);
            }
        }

        debug!(?stats, "consume loop finished");
        Ok(stats)
    }

    fn budget_spent(&self, stats: &ConsumeStats) -> bool {
        self.options
            .max_messages
            .is_some_and(|max| stats.delivered >= max)
    }

    /// Pause following one poll. Errors bump `consecutive_errors`; anything else resets it.
    pub(crate) fn pause_after(
        &self,
        polled: &PollOutcome,
        consecutive_errors: &mut u32,
    ) -> Duration {
        match polled {
            PollOutcome::Message(_) => {
                *consecutive_errors = 0;
                Duration::ZERO
            }
            PollOutcome::Timeout | PollOutcome::Empty => {
                *consecutive_errors = 0;
                self.options.idle_interval
            }
            PollOutcome::Error(_) => {
                *consecutive_errors = consecutive_errors.saturating_add(1);
                self.error_delay(*consecutive_errors)
            }
        }
    }

    /// Delay after the `consecutive`-th error in a row: doubles from `error_backoff`, capped.
    pub(crate) fn error_delay(&self, consecutive: u32) -> Duration {
        let doublings = consecutive.saturating_sub(1).min(MAX_BACKOFF_DOUBLINGS);
        self.options
            .error_backoff
            .saturating_mul(1u32 << doublings)
            .min(self.options.max_error_backoff)
    }
}
