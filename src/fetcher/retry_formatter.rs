//! Retry message formatting for the retry gate.
//!
//! Keeps the wording of retry, recovery and give-up log lines consistent
//! between page fetches and per-entity lookups.

use std::time::Duration;

use crate::fetcher::FetcherError;

/// Classification of retryable failures for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Connection, timeout or other transport failure
    Transport,
    /// Body could not be decoded ("data not ready")
    Parse,
    /// Anything else
    Other,
}

impl RetryErrorType {
    /// Classify a fetcher error
    pub fn from_error(error: &FetcherError) -> Self {
        match error {
            FetcherError::Transport(_) => Self::Transport,
            FetcherError::Parse(_) => Self::Parse,
            _ => Self::Other,
        }
    }

    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transport => "connection failed",
            Self::Parse => "data not ready",
            Self::Other => "request failed",
        }
    }

    /// Suggested remediation shown when a lookup gives up.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Transport => "Check network connectivity and the API base URL",
            Self::Parse => "The API kept returning incomplete data, retry the entity later",
            Self::Other => "Inspect the JSON log for the raw response",
        }
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts, `None` when unbounded
    pub max_attempts: Option<u32>,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Wait before the next attempt
    pub interval: Duration,
    /// What is being fetched (e.g., "page 3 of subquery 1 window 2", "user alice")
    pub target: String,
    /// Original error message for details
    pub error_message: String,
}

impl RetryContext {
    /// Convenience constructor used by the retry gate.
    pub fn new(
        attempt: u32,
        max_attempts: Option<u32>,
        error: &FetcherError,
        interval: Duration,
        target: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type: RetryErrorType::from_error(error),
            interval,
            target: target.into(),
            error_message: error.to_string(),
        }
    }

    fn attempt_label(&self) -> String {
        match self.max_attempts {
            Some(max) => format!("{}/{}", self.attempt, max),
            None => self.attempt.to_string(),
        }
    }

    /// Format standardized retry message with attempt counter and target.
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying {} (attempt {}) after {} - waiting {:.1} seconds...",
            self.target,
            self.attempt_label(),
            self.error_type.description(),
            self.interval.as_secs_f64()
        )
    }

    /// Format recovery message when a later attempt works.
    pub fn format_success(&self) -> String {
        format!(
            "Attempt {} succeeded for {} - resuming",
            self.attempt_label(),
            self.target
        )
    }

    /// Format final failure summary with a suggestion.
    pub fn format_failure(&self) -> String {
        format!(
            "[FAILED] {} gave up after {} attempts. Last error: {}. {}",
            self.target,
            self.attempt,
            self.error_message,
            self.error_type.suggestion()
        )
    }
}
