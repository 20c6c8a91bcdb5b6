//! Collection constants

use std::time::Duration;

/// Results requested per page (`max_count`); the API maximum.
pub const PAGE_SIZE: u32 = 100;

/// Longest date span the video query endpoint accepts in one request.
pub const MAX_WINDOW_DAYS: u32 = 30;

/// Wait between attempts of a page fetch.
pub const PAGE_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Wait between attempts of a per-entity lookup.
pub const LOOKUP_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Retries of a per-entity lookup after the first failed attempt.
/// The lookup gives up once this many retries have also failed.
pub const LOOKUP_MAX_RETRIES: u32 = 5;

/// Pause between consecutive user lookups.
pub const LOOKUP_PAUSE: Duration = Duration::from_secs(1);

/// Timestamp format used in run output names (`20240131_154500`).
pub const RUN_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
