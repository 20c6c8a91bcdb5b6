//! Collection passes and the scheduled run loop
//!
//! This module drives a complete video collection: base queries are paired
//! with date windows, every subquery is paged to the end, results are
//! deduplicated and written once per pass.
//!
//! # Overview
//!
//! 1. **Partition**: [`crate::config::CollectionConfig::base_queries`] expands the filter fields
//! 2. **Windows**: [`crate::query::iterate_windows`] splits the date range
//! 3. **Paging**: [`crate::fetcher::pagination::Paginator`] walks each subquery
//! 4. **Accumulate**: [`crate::ResultAccumulator`] drops duplicate videos
//! 5. **Persist**: one CSV per pass, stamped with the pass start time
//! 6. **Repeat**: [`schedule::wait_for_next_run`] sleeps until the next pass
//!
//! # Quick Start
//!
//! ```no_run
//! use research_data_downloader::config::CollectionConfig;
//! use research_data_downloader::downloader::CollectionRunner;
//! use research_data_downloader::fetcher::ApiConnector;
//! use std::sync::Arc;
//!
//! # async fn example(connector: Arc<dyn ApiConnector>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = CollectionConfig::load("collect.yaml")?;
//! let passes = CollectionRunner::new(connector)
//!     .with_test_mode(true)
//!     .run(&config)
//!     .await?;
//! for pass in &passes {
//!     println!("{}: {} videos", pass.output.display(), pass.videos);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`executor`] - Collection runner and per-pass summary
//! - [`schedule`] - Hourly / daily waits between passes
//! - [`media`] - Video file downloads through `yt-dlp`
//! - [`config`] - Collection constants

pub mod config;
pub mod executor;
pub mod media;
pub mod schedule;

pub use executor::{CollectionRunner, PassSummary};
pub use schedule::Schedule;

use crate::config::ConfigError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;

/// Download errors
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Configuration could not be turned into queries
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fetcher error (authentication, transport)
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// External tool missing or failing
    #[error("tool error: {0}")]
    Tool(String),
}
