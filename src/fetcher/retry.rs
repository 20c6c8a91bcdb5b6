//! Fixed-interval retry gate
//!
//! Two policies wrap a single API call:
//!
//! - [`RetryPolicy::Unbounded`] retries transient failures forever (page
//!   fetches). An optional attempt ceiling and the shutdown hook are the only
//!   ways out.
//! - [`RetryPolicy::Bounded`] gives up once `max_retries` retries after the
//!   first attempt have failed (per-entity lookups).
//!
//! Only transient failures ([`FetcherError::is_transient`]) are retried; API
//! error codes and authentication failures pass straight through.

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::downloader::config::{LOOKUP_MAX_RETRIES, LOOKUP_RETRY_INTERVAL, PAGE_RETRY_INTERVAL};
use crate::fetcher::retry_formatter::RetryContext;
use crate::fetcher::{FetcherError, FetcherResult};
use crate::metrics;
use crate::shutdown::{sleep_unless_shutdown, SharedShutdown};

/// How a failing call is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry until success, or until `max_attempts` when set
    Unbounded {
        /// Wait between attempts
        interval: Duration,
        /// Optional ceiling on total attempts
        max_attempts: Option<u32>,
    },
    /// Give up after `max_retries` failed retries
    Bounded {
        /// Wait between attempts
        interval: Duration,
        /// Retries allowed after the first attempt
        max_retries: u32,
    },
}

impl RetryPolicy {
    /// Page fetch policy: 1 second, forever
    pub fn unbounded() -> Self {
        Self::Unbounded {
            interval: PAGE_RETRY_INTERVAL,
            max_attempts: None,
        }
    }

    /// Lookup policy: 2 seconds, 5 retries
    pub fn bounded() -> Self {
        Self::Bounded {
            interval: LOOKUP_RETRY_INTERVAL,
            max_retries: LOOKUP_MAX_RETRIES,
        }
    }

    /// Replace the wait between attempts
    pub fn with_interval(self, interval: Duration) -> Self {
        match self {
            Self::Unbounded { max_attempts, .. } => Self::Unbounded {
                interval,
                max_attempts,
            },
            Self::Bounded { max_retries, .. } => Self::Bounded {
                interval,
                max_retries,
            },
        }
    }

    /// Cap an unbounded policy at `max_attempts` total attempts
    pub fn with_max_attempts(self, max_attempts: Option<u32>) -> Self {
        match self {
            Self::Unbounded { interval, .. } => Self::Unbounded {
                interval,
                max_attempts,
            },
            bounded => bounded,
        }
    }

    /// Wait between attempts
    pub fn interval(&self) -> Duration {
        match self {
            Self::Unbounded { interval, .. } | Self::Bounded { interval, .. } => *interval,
        }
    }

    /// Total attempts allowed, `None` when unbounded
    pub fn max_attempts(&self) -> Option<u32> {
        match self {
            Self::Unbounded { max_attempts, .. } => *max_attempts,
            Self::Bounded { max_retries, .. } => Some(max_retries + 1),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Unbounded { .. } => "unbounded",
            Self::Bounded { .. } => "bounded",
        }
    }
}

/// Applies a [`RetryPolicy`] to async calls
#[derive(Debug, Clone)]
pub struct RetryGate {
    policy: RetryPolicy,
    shutdown: Option<SharedShutdown>,
}

impl RetryGate {
    /// Create a gate for the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            shutdown: None,
        }
    }

    /// Let Ctrl+C interrupt retry waits
    pub fn with_shutdown(mut self, shutdown: Option<SharedShutdown>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Run `operation` until it succeeds, fails permanently or the policy gives up.
    ///
    /// The failure counter is local to this call, so every page or entity
    /// starts from zero.
    ///
    /// # Errors
    /// - non-transient errors from `operation`, unchanged
    /// - [`FetcherError::RetriesExhausted`] when the policy gives up
    /// - [`FetcherError::Shutdown`] when shutdown interrupts a wait
    pub async fn run<T, F, Fut>(&self, target: &str, mut operation: F) -> FetcherResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FetcherResult<T>>,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 1;
        let mut last_retry: Option<RetryContext> = None;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if let Some(mut ctx) = last_retry {
                        ctx.attempt = attempt;
                        info!("{}", ctx.format_success());
                    }
                    return Ok(value);
                }
                Err(error) if !error.is_transient() => return Err(error),
                Err(error) => error,
            };

            let ctx = RetryContext::new(
                attempt,
                max_attempts,
                &error,
                self.policy.interval(),
                target,
            );

            if max_attempts.is_some_and(|max| attempt >= max) {
                warn!("{}", ctx.format_failure());
                return Err(FetcherError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            }

            info!("{}", ctx.format_retry());
            metrics::record_retry(self.policy.label());

            if !sleep_unless_shutdown(self.shutdown.as_ref(), self.policy.interval()).await {
                return Err(FetcherError::Shutdown);
            }
            last_retry = Some(ctx);
            attempt += 1;
        }
    }

    /// Sleep for `duration`, interruptible by shutdown.
    ///
    /// Returns `false` if shutdown was requested.
    pub async fn pause(&self, duration: Duration) -> bool {
        sleep_unless_shutdown(self.shutdown.as_ref(), duration).await
    }
}
