//! Resilient execution combinator used by the RPC layer.
//!
//! [`Retry`] runs an async operation until it succeeds, fails with a
//! non-retryable error, or exhausts its attempt budget. The budget comes from a
//! [`RetrySpec`]: either a plain attempt count or an explicit backoff schedule,
//! in which case the budget is one more than the schedule length.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use courier_core::retry::{Retry, RetrySpec};
//!
//! let spec = RetrySpec::Backoff(vec![Duration::from_millis(100), Duration::from_millis(200)]);
//! let value = Retry::new(spec).run(|attempt| async move { call_remote(attempt).await }).await?;
//! ```

use std::time::Duration;

use tracing::debug;

/// Errors that may ask for another attempt.
///
/// Only errors returning `Some` from [`retry_after`](Retryable::retry_after)
/// are retried; everything else is handed straight back to the caller.
pub trait Retryable {
    /// Suggested wait before the next attempt, if this failure is retryable.
    fn retry_after(&self) -> Option<Duration>;
}

/// Attempt budget for a [`Retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrySpec {
    /// Maximum number of attempts. At least one attempt is always made.
    Attempts(u32),
    /// Explicit waits between attempts; attempts = schedule length + 1.
    Backoff(Vec<Duration>),
}

impl RetrySpec {
    /// Total number of attempts this spec allows.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Attempts(n) => *n,
            Self::Backoff(schedule) => u32::try_from(schedule.len())
                .unwrap_or(u32::MAX)
                .saturating_add(1),
        }
    }

    /// Scheduled wait after the given (1-based) attempt, if any.
    fn scheduled_delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::Attempts(_) => None,
            Self::Backoff(schedule) => schedule.get(attempt as usize - 1).copied(),
        }
    }
}

impl From<u32> for RetrySpec {
    fn from(attempts: u32) -> Self {
        Self::Attempts(attempts)
    }
}

impl From<Vec<Duration>> for RetrySpec {
    fn from(schedule: Vec<Duration>) -> Self {
        Self::Backoff(schedule)
    }
}

/// Hook computing the wait before the next attempt: `(attempt, failure) -> wait`.
pub type SleepFn<'a, E> = &'a mut (dyn FnMut(u32, &E) -> Duration + Send);

/// Optional gate deciding whether a retryable failure should actually be retried.
pub type WhenFn<'a, E> = &'a (dyn Fn(&E) -> bool + Sync);

/// Retry/backoff invoker.
#[derive(Debug, Clone)]
pub struct Retry {
    spec: RetrySpec,
    default_delay: Duration,
}

impl Retry {
    /// Creates a new invoker with no default delay.
    pub fn new(spec: impl Into<RetrySpec>) -> Self {
        Self {
            spec: spec.into(),
            default_delay: Duration::ZERO,
        }
    }

    /// Wait used when neither the schedule nor a sleep hook provides one.
    pub fn default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Returns the attempt budget.
    pub fn spec(&self) -> &RetrySpec {
        &self.spec
    }

    /// Runs `op` with the schedule or default delay between attempts.
    pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        E: Retryable + Send,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute(op, None, None).await
    }

    /// Runs `op`, asking `sleep` for the wait whenever the schedule has none.
    pub async fn run_with<T, E, F, Fut, S>(&self, op: F, mut sleep: S) -> Result<T, E>
    where
        E: Retryable + Send,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        S: FnMut(u32, &E) -> Duration + Send,
    {
        self.execute(op, Some(&mut sleep), None).await
    }

    /// Full form: optional sleep hook and optional retry gate.
    ///
    /// The sleep hook only computes the wait. Whether another attempt happens
    /// is decided by the remaining budget, the failure kind and `when`.
    pub async fn execute<T, E, F, Fut>(
        &self,
        mut op: F,
        mut sleep: Option<SleepFn<'_, E>>,
        when: Option<WhenFn<'_, E>>,
    ) -> Result<T, E>
    where
        E: Retryable + Send,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        let mut remaining = self.spec.attempts();

        loop {
            attempt += 1;
            remaining = remaining.saturating_sub(1);

            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let retryable = err.retry_after().is_some() && when.is_none_or(|gate| gate(&err));
            if !retryable || remaining < 1 {
                return Err(err);
            }

            let delay = self
                .spec
                .scheduled_delay(attempt)
                .or_else(|| sleep.as_deref_mut().map(|hook| hook(attempt, &err)))
                .unwrap_or(self.default_delay);

            debug!(
                attempt,
                remaining,
                delay_ms = delay.as_millis() as u64,
                "Retryable failure, backing off"
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Shorthand for `Retry::new(spec).run(op)`.
pub async fn retry<T, E, F, Fut>(spec: impl Into<RetrySpec>, op: F) -> Result<T, E>
where
    E: Retryable + Send,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    Retry::new(spec).run(op).await
}

/// Shorthand for `Retry::new(spec).run_with(op, sleep)`.
pub async fn retry_with<T, E, F, Fut, S>(
    spec: impl Into<RetrySpec>,
    op: F,
    sleep: S,
) -> Result<T, E>
where
    E: Retryable + Send,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    S: FnMut(u32, &E) -> Duration + Send,
{
    Retry::new(spec).run_with(op, sleep).await
}
