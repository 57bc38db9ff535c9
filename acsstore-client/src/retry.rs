//! Bounded retry with linear backoff around a single HTTP step.
//!
//! Attempt `i` (1-based) that fails transiently is followed by a pause of
//! `i * backoff_step` before attempt `i + 1`. With the defaults (10 attempts,
//! 500ms step) the runner sleeps at most 22.5s in total.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use acsstore_common::{HttpOutcome, TransportError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(500);

/// How the runner treats the result of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Hand the outcome to the caller for status interpretation.
    Done,
    /// Transient failure; try again if budget remains.
    Retry(String),
}

/// Statuses outside `[200, 500)` are transient, including 0 (no response).
pub fn is_retryable_status(status: u16) -> bool {
    !(200..500).contains(&status)
}

pub fn judge(result: &Result<HttpOutcome, TransportError>) -> Verdict {
    match result {
        Err(e) if !e.is_retryable() => Verdict::Done,
        Err(e) => Verdict::Retry(e.to_string()),
        Ok(outcome) if is_retryable_status(outcome.status) => {
            Verdict::Retry(format!("HTTP {}", outcome.status))
        }
        Ok(_) => Verdict::Done,
    }
}

type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_step: Duration,
    sleeper: Sleeper,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("backoff_step", &self.backoff_step)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BACKOFF_STEP)
    }
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_step,
            sleeper: Arc::new(std::thread::sleep),
        }
    }

    /// Replace the blocking sleep between attempts.
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause after failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    /// Run `call` until it yields a non-transient result or the attempt
    /// budget is spent. `call` receives the 1-based attempt number.
    ///
    /// On exhaustion a transient status outcome is returned as `Ok` so the
    /// caller can classify it; a transport error is returned as `Err`.
    pub fn run<F>(&self, step: &str, mut call: F) -> Result<HttpOutcome, TransportError>
    where
        F: FnMut(u32) -> Result<HttpOutcome, TransportError>,
    {
        let mut attempt = 1;
        loop {
            let result = call(attempt);
            let reason = match judge(&result) {
                Verdict::Done => {
                    if attempt > 1 {
                        debug!(step, attempt, "Request succeeded after retry");
                    }
                    return result;
                }
                Verdict::Retry(reason) => reason,
            };

            if attempt >= self.max_attempts {
                error!(step, attempts = attempt, reason = %reason, "Retry budget exhausted");
                return result;
            }

            let delay = self.delay_for(attempt);
            warn!(
                step,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Transient storage failure, retrying"
            );
            (self.sleeper)(delay);
            attempt += 1;
        }
    }
}
