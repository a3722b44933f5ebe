//! Bounded retry combinator.
//!
//! Runs an async operation until it succeeds, fails with an error the
//! predicate refuses to retry, or the attempt budget is spent. Sleeps
//! between attempts with `tokio::time::sleep`.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same interval every time.
    Fixed,
    /// `interval * factor^(n-1)`, capped at `max_interval`.
    Exponential { factor: f64, max_interval: Duration },
}

/// Attempt budget and pacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first (at least one is always made).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub interval: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Fixed-interval policy.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            backoff: Backoff::Fixed,
        }
    }

    /// Exponential policy.
    pub fn exponential(
        max_attempts: u32,
        interval: Duration,
        factor: f64,
        max_interval: Duration,
    ) -> Self {
        Self {
            max_attempts,
            interval,
            backoff: Backoff::Exponential {
                factor,
                max_interval,
            },
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential {
                factor,
                max_interval,
            } => {
                let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                let secs = self.interval.as_secs_f64() * factor.max(1.0).powi(exp);
                if secs.is_finite() && secs < max_interval.as_secs_f64() {
                    Duration::from_secs_f64(secs)
                } else {
                    max_interval
                }
            }
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    /// A non-retryable error, returned unmodified.
    #[error("{0}")]
    Aborted(E),
}

impl<E> RetryError<E> {
    /// The underlying error, regardless of how the retry ended.
    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { last, .. } | Self::Aborted(last) => last,
        }
    }
}

/// Retry `op` while `should_retry` accepts its error.
pub async fn retry_when<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut should_retry: P,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !should_retry(&e) => return Err(RetryError::Aborted(e)),
            Err(e) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: e,
                });
            }
            Err(_) => {
                let delay = policy.delay_after(attempt);
                debug!(attempt, delay_ms = delay.as_millis(), "Retrying");
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
