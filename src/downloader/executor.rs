//! Collection runner: repeated, scheduled passes over all subqueries
//!
//! A non-"ok" API code ends only the current window. A run-fatal code (quota
//! exhausted, credentials rejected) or a shutdown ends the whole pass: the
//! remaining subqueries are skipped until the next pass and the videos
//! collected so far are still written.

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument, Span};

use crate::accumulator::ResultAccumulator;
use crate::config::CollectionConfig;
use crate::downloader::schedule::wait_for_next_run;
use crate::downloader::DownloadError;
use crate::fetcher::pagination::{Paginator, Termination};
use crate::fetcher::retry::{RetryGate, RetryPolicy};
use crate::fetcher::ApiConnector;
use crate::metrics;
use crate::output::{run_output_path, write_entities, WriteMode};
use crate::query::{iterate_windows, FilterExpression};
use crate::shutdown::SharedShutdown;
use crate::EntityKind;

/// What one pass produced
#[derive(Debug, Clone, PartialEq)]
pub struct PassSummary {
    /// Pass number (1-based)
    pub repeat: u32,
    /// CSV the pass appended to
    pub output: PathBuf,
    /// Distinct videos collected
    pub videos: usize,
    /// Duplicate videos dropped
    pub duplicates: u64,
    /// Subquery windows paged
    pub windows: usize,
    /// Set when the pass ended before the last window
    pub stopped: Option<Termination>,
    /// Whether anything was written to `output`
    pub written: bool,
}

/// Runs the configured number of collection passes
pub struct CollectionRunner {
    connector: Arc<dyn ApiConnector>,
    page_policy: RetryPolicy,
    shutdown: Option<SharedShutdown>,
    test_mode: bool,
}

impl CollectionRunner {
    /// Runner authenticating through `connector` once per pass
    pub fn new(connector: Arc<dyn ApiConnector>) -> Self {
        Self {
            connector,
            page_policy: RetryPolicy::unbounded(),
            shutdown: None,
            test_mode: false,
        }
    }

    /// Retry policy for page fetches
    pub fn with_page_policy(mut self, policy: RetryPolicy) -> Self {
        self.page_policy = policy;
        self
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Skip schedule waits between passes
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Run `config.total` passes, waiting for the schedule between them.
    ///
    /// Stops early when shutdown is requested.
    ///
    /// # Errors
    /// Configuration that cannot be partitioned, authentication failures and
    /// CSV write failures abort the run.
    pub async fn run(&self, config: &CollectionConfig) -> Result<Vec<PassSummary>, DownloadError> {
        let base_queries = config.base_queries()?;
        let span = info_span!("collection", out_base = %config.out_base, total = config.total);

        async {
            info!(
                config = %serde_json::to_string(config).unwrap_or_default(),
                base_queries = base_queries.len(),
                windows_per_query = config.windows_per_query(),
                "Collection started"
            );

            let mut passes = Vec::new();
            for repeat in 1..=config.total {
                if repeat > 1
                    && !self.test_mode
                    && !wait_for_next_run(config.schedule, self.shutdown.as_ref()).await
                {
                    info!("Shutdown requested, no further passes");
                    break;
                }

                let summary = self.run_pass(config, &base_queries, repeat).await?;
                let interrupted = summary.stopped == Some(Termination::Shutdown);
                passes.push(summary);

                if interrupted || self.shutdown_requested() {
                    info!("Shutdown requested, no further passes");
                    break;
                }
            }

            info!(passes = passes.len(), "Collection finished");
            Ok::<_, DownloadError>(passes)
        }
        .instrument(span)
        .await
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|s| s.is_shutdown_requested())
    }

    /// One full pass: every base query over every window, then one CSV write
    pub async fn run_pass(
        &self,
        config: &CollectionConfig,
        base_queries: &[FilterExpression],
        repeat: u32,
    ) -> Result<PassSummary, DownloadError> {
        let started = Local::now().naive_local();
        let output = run_output_path(&config.out_base, started, "csv");
        let span = info_span!("pass", repeat, output = %output.display());

        self.collect_pass(config, base_queries, repeat, output)
            .instrument(span)
            .await
    }

    async fn collect_pass(
        &self,
        config: &CollectionConfig,
        base_queries: &[FilterExpression],
        repeat: u32,
        output: PathBuf,
    ) -> Result<PassSummary, DownloadError> {
        info!("Pass {} of {} started", repeat, config.total);

        let api = self.connector.connect().await?;
        let gate = RetryGate::new(self.page_policy).with_shutdown(self.shutdown.clone());
        let paginator = Paginator::new(api.as_ref(), gate, Span::current());

        let query_count = base_queries.len();
        let windows_per_query = config.windows_per_query();
        let total_windows = query_count * windows_per_query;

        let mut results = ResultAccumulator::new(EntityKind::Video);
        let mut windows = 0;
        let mut stopped = None;

        for subquery in iterate_windows(base_queries, config.d_start, config.d_end, config.increment) {
            let query_no = subquery.query_index + 1;
            let window_no = subquery.window_index + 1;

            if subquery.window_index == 0 {
                info!(
                    subquery = query_no,
                    expression = %subquery.expression.to_value(),
                    "Sub-query {} of {} started",
                    query_no,
                    query_count
                );
            }
            info!(
                subquery = query_no,
                window = %subquery.window,
                "Window {} of {} started",
                window_no,
                windows_per_query
            );

            let run = paginator.fetch_all(&subquery).await;
            let fetched = run.entities.len();
            let added = results.add(run.entities);
            windows += 1;

            if fetched == 0 {
                info!(subquery = query_no, window = %subquery.window, "No videos for this window");
            }
            info!(
                subquery = query_no,
                window = %subquery.window,
                pages = run.pages,
                fetched,
                added,
                entities = results.len(),
                termination = %run.termination,
                "Window {} of {} finished ({}/{} overall)",
                window_no,
                windows_per_query,
                windows,
                total_windows
            );

            let fatal = run.termination.is_run_fatal();
            if !fatal && !run.termination.is_complete() {
                warn!(
                    subquery = query_no,
                    window = %subquery.window,
                    termination = %run.termination,
                    "Window ended early, keeping its partial results"
                );
            }
            if window_no == windows_per_query || fatal {
                info!(
                    subquery = query_no,
                    entities = results.len(),
                    "Sub-query {} of {} finished",
                    query_no,
                    query_count
                );
            }
            if fatal {
                warn!(termination = %run.termination, "Ending pass early, keeping partial results");
                stopped = Some(run.termination);
                break;
            }
        }

        let duplicates = results.duplicates_skipped();
        let videos = results.finalize();
        metrics::record_entities("video", videos.len());

        let written = if videos.is_empty() {
            info!("No videos collected, nothing written");
            false
        } else {
            write_entities(&output, &videos, WriteMode::Append)?;
            true
        };

        info!(
            videos = videos.len(),
            duplicates,
            windows,
            "Pass {} of {} finished",
            repeat,
            config.total
        );

        Ok(PassSummary {
            repeat,
            output,
            videos: videos.len(),
            duplicates,
            windows,
            stopped,
            written,
        })
    }
}
