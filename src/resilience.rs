// ABOUTME: Retry-with-exponential-backoff wrapper for nutrition and completion calls
// ABOUTME: Pluggable policy (attempts, backoff, retryable predicate) and event emission
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Calorie Tuner Contributors

//! Resilience layer
//!
//! [`Resilience::run`] guards one logical call. Each attempt emits
//! `AttemptStarted`; a retryable failure with budget left emits
//! `RetryScheduled` and sleeps for the policy's backoff; the call ends with
//! `Succeeded` or `Failed`. Exhausting the budget returns the last error
//! unchanged, so callers still see the original [`ErrorCode`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::constants::retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::events::{EventBus, EventKind};

/// Delay to wait after the given failed attempt (1-based)
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Decides whether a failure is worth another attempt
pub type RetryPredicate = Arc<dyn Fn(&AppError) -> bool + Send + Sync>;

/// `min(base_ms * 2^(attempt - 1), max_ms)` milliseconds
#[must_use]
pub fn exponential_delay_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let factor = 1_u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(max_ms)
}

/// Default classification of transient failures
///
/// Rate limits, timeouts, unreachable services, malformed completion output,
/// and upstream 429/5xx responses are retried. Validation errors, missing
/// foods, and other upstream 4xx responses are not.
#[must_use]
pub fn is_transient(error: &AppError) -> bool {
    match error.code {
        ErrorCode::ExternalRateLimited
        | ErrorCode::ExternalTimeout
        | ErrorCode::ExternalUnavailable
        | ErrorCode::MalformedOutput => true,
        ErrorCode::UpstreamError => error
            .upstream_status()
            .is_some_and(|status| status == 429 || status >= 500),
        _ => false,
    }
}

/// Retry policy injected into [`Resilience`]
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffFn,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    /// Exponential backoff from `base_ms` capped at `max_ms`, retrying transient failures
    #[must_use]
    pub fn exponential(max_attempts: u32, base_ms: u64, max_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Arc::new(move |attempt| {
                Duration::from_millis(exponential_delay_ms(attempt, base_ms, max_ms))
            }),
            retryable: Arc::new(is_transient),
        }
    }

    /// Same classification as the default policy but without any delay
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::exponential(max_attempts, 0, 0)
    }

    /// Never retry
    #[must_use]
    pub fn no_retry() -> Self {
        Self::immediate(1)
    }

    /// Replace the backoff function
    #[must_use]
    pub fn with_backoff(mut self, backoff: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Replace the retryable predicate
    #[must_use]
    pub fn with_retryable(
        mut self,
        retryable: impl Fn(&AppError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.retryable = Arc::new(retryable);
        self
    }

    /// Attempts allowed per call, including the first
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff after the given failed attempt
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }

    /// Whether `error` may be retried
    #[must_use]
    pub fn is_retryable(&self, error: &AppError) -> bool {
        (self.retryable)(error)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BASE_DELAY_MS,
            DEFAULT_MAX_DELAY_MS,
        )
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Guards calls with a [`RetryPolicy`] and reports progress on an [`EventBus`]
#[derive(Debug, Clone)]
pub struct Resilience {
    policy: RetryPolicy,
    events: Arc<EventBus>,
}

impl Resilience {
    /// Create a resilience layer
    #[must_use]
    pub const fn new(policy: RetryPolicy, events: Arc<EventBus>) -> Self {
        Self { policy, events }
    }

    /// The event bus this layer reports to
    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// The active policy
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call` until it succeeds, fails permanently, or the budget is spent
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `call`
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.events.emit(EventKind::AttemptStarted {
                operation: operation.to_owned(),
                attempt,
            });

            let err = match call().await {
                Ok(value) => {
                    self.events.emit(EventKind::Succeeded {
                        operation: operation.to_owned(),
                        attempts: attempt,
                    });
                    return Ok(value);
                }
                Err(err) => err,
            };

            if attempt >= max_attempts || !self.policy.is_retryable(&err) {
                error!(
                    operation,
                    attempt,
                    code = ?err.code,
                    "Giving up after attempt {attempt}/{max_attempts}: {err}"
                );
                self.events.emit(EventKind::Failed {
                    operation: operation.to_owned(),
                    attempts: attempt,
                    code: err.code,
                    error: err.message.clone(),
                });
                return Err(err);
            }

            let delay = self.policy.delay_after(attempt);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            warn!(
                operation,
                attempt,
                code = ?err.code,
                "Attempt {attempt}/{max_attempts} failed, retrying in {delay_ms}ms: {err}"
            );
            self.events.emit(EventKind::RetryScheduled {
                operation: operation.to_owned(),
                attempt,
                delay_ms,
                code: err.code,
                error: err.message.clone(),
            });
            tokio::time::sleep(delay).await;
        }
    }
}
