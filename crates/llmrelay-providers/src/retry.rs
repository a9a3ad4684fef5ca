//! Bounded retry with fixed exponential backoff.
//!
//! One policy type serves every endpoint: it is parameterized by the number
//! of attempts, the base delay, and a predicate deciding which failed
//! outcomes are worth another attempt. Delays double after each failed
//! attempt (100ms, 200ms, 400ms, ...) and are only slept *between* attempts.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use llmrelay_core::error::is_transient_status;
use llmrelay_core::utils::truncate_string;
use llmrelay_core::{RelayError, Result};

use crate::transport::RawResponse;

/// Decides whether a failed attempt should be retried.
pub type RetryPredicate = fn(&Result<RawResponse>) -> bool;

/// Retry every failure: transport errors and any non-200 status.
pub fn retry_any_failure(_outcome: &Result<RawResponse>) -> bool {
    true
}

/// Retry transport errors and transient statuses (408, 429, 502) only.
///
/// Neither preset uses this; it is for callers whose endpoint answers
/// client errors deterministically, where repeating a 400 only burns the budget.
pub fn retry_transient(outcome: &Result<RawResponse>) -> bool {
    match outcome {
        Ok(resp) => is_transient_status(resp.status),
        Err(RelayError::Transport(_)) => true,
        Err(_) => false,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    /// A policy retrying any failure up to `max_attempts` attempts in total.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
            retryable: retry_any_failure,
        }
    }

    /// Fallback-model loop of the completion endpoint: 3 attempts.
    pub fn completion_fallback() -> Self {
        Self::new(3, Duration::from_millis(100))
    }

    /// Per-call loop of the transcription endpoint: 5 attempts, any failure
    /// (including 4xx) is retried.
    pub fn transcription() -> Self {
        Self::new(5, Duration::from_millis(100))
    }

    /// Replace the retryable-outcome predicate, e.g. with [`retry_transient`]
    /// to stop at the first non-transient status.
    pub fn retry_if(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay * 2u32.pow(exponent)
    }

    /// Every delay a fully exhausted run sleeps, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|a| self.delay_for(a)).collect()
    }

    /// Run `attempt` until it yields a 200 response or the policy gives up.
    ///
    /// The closure receives the 1-based attempt number. A failed outcome the
    /// predicate rejects is returned immediately: a non-200 response becomes
    /// [`RelayError::HttpStatus`], an error is passed through. Running out of
    /// attempts yields [`RelayError::RetryExhausted`] with the last status
    /// and body (status 0 if the last attempt got no response).
    pub async fn run<F, Fut>(&self, mut attempt: F) -> Result<RawResponse>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<RawResponse>>,
    {
        let mut last_status = 0;
        let mut last_body = String::new();

        for n in 1..=self.max_attempts {
            let outcome = attempt(n).await;

            if matches!(&outcome, Ok(resp) if resp.is_success()) {
                if n > 1 {
                    debug!(attempt = n, "retry succeeded");
                }
                return outcome;
            }

            if !(self.retryable)(&outcome) {
                return match outcome {
                    Ok(resp) => Err(RelayError::HttpStatus {
                        status: resp.status,
                        body: resp.body_text(),
                    }),
                    Err(e) => Err(e),
                };
            }

            (last_status, last_body) = match outcome {
                Ok(resp) => (resp.status, resp.body_text()),
                Err(e) => (0, e.to_string()),
            };

            if n < self.max_attempts {
                let delay = self.delay_for(n);
                warn!(
                    attempt = n,
                    max_attempts = self.max_attempts,
                    status = last_status,
                    delay_ms = delay.as_millis() as u64,
                    body = %truncate_string(&last_body, 200),
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }

        error!(
            attempts = self.max_attempts,
            status = last_status,
            "retry budget exhausted"
        );
        Err(RelayError::RetryExhausted {
            attempts: self.max_attempts,
            status: last_status,
            body: last_body,
        })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
