//! Bounded, cancellable retry loop.
//!
//! Replaces open-ended polling with a loop capped by attempt count and,
//! optionally, total elapsed time. A [`CancelToken`] set from another thread
//! ends the loop before the next attempt or during the inter-attempt delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Granularity of cancel checks while sleeping between attempts.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// How a retry loop ended. `attempts` counts attempts actually run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded { attempts: u32 },
    Exhausted { attempts: u32 },
    TimedOut { attempts: u32 },
    Cancelled { attempts: u32 },
}

impl RetryOutcome {
    pub fn attempts(self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts }
            | RetryOutcome::Exhausted { attempts }
            | RetryOutcome::TimedOut { attempts }
            | RetryOutcome::Cancelled { attempts } => attempts,
        }
    }

    pub fn succeeded(self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Retry {
    max_attempts: u32,
    delay: Duration,
    deadline: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl Retry {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
            deadline: None,
            cancel: None,
        }
    }

    /// Pause between a failed attempt and the next one.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Total time budget, measured from the start of `run`.
    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn cancel_on(mut self, token: &CancelToken) -> Self {
        self.cancel = Some(token.clone());
        self
    }

    /// Run `attempt` (called with the 1-based attempt number) until it
    /// returns true or a bound is hit.
    pub fn run(&self, mut attempt: impl FnMut(u32) -> bool) -> RetryOutcome {
        let started = Instant::now();
        let mut attempts = 0;

        while attempts < self.max_attempts {
            if self.cancelled() {
                return RetryOutcome::Cancelled { attempts };
            }
            if self.expired(started) {
                return RetryOutcome::TimedOut { attempts };
            }

            attempts += 1;
            if attempt(attempts) {
                return RetryOutcome::Succeeded { attempts };
            }

            if attempts < self.max_attempts && !self.delay.is_zero() {
                if let Some(outcome) = self.sleep(started, attempts) {
                    return outcome;
                }
            }
        }

        RetryOutcome::Exhausted { attempts }
    }

    fn sleep(&self, started: Instant, attempts: u32) -> Option<RetryOutcome> {
        let wake = Instant::now() + self.delay;
        loop {
            if self.cancelled() {
                return Some(RetryOutcome::Cancelled { attempts });
            }
            if self.expired(started) {
                return Some(RetryOutcome::TimedOut { attempts });
            }
            let now = Instant::now();
            if now >= wake {
                return None;
            }
            thread::sleep((wake - now).min(CANCEL_POLL));
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map(CancelToken::is_cancelled).unwrap_or(false)
    }

    fn expired(&self, started: Instant) -> bool {
        self.deadline.map(|d| started.elapsed() >= d).unwrap_or(false)
    }
}
