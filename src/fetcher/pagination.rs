//! Cursor pagination over the video query endpoint
//!
//! A [`Paginator`] drives one [`SubQuery`] through as many pages as the API
//! hands out. Each page request goes through the [`RetryGate`]; the loop ends
//! when a page reports `has_more = false`, when the API answers with an error
//! code, or when the gate gives up.

use serde_json::json;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::downloader::config::PAGE_SIZE;
use crate::fetcher::response::{ApiErrorCode, PageCursor, VideoPage};
use crate::fetcher::retry::RetryGate;
use crate::fetcher::{Endpoint, FetcherError, ResearchApi};
use crate::query::SubQuery;
use crate::Entity;

/// Why pagination of a subquery stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The last page reported `has_more = false`
    Exhausted,
    /// The API answered with a non-"ok" code
    ApiError {
        /// Error code
        code: ApiErrorCode,
        /// Error message
        message: String,
    },
    /// A page ran out of attempts under a capped retry policy
    RetriesExhausted {
        /// Attempts made for the failing page
        attempts: u32,
    },
    /// Shutdown interrupted a retry wait
    Shutdown,
    /// Any other non-retryable failure
    Failed(String),
}

impl Termination {
    /// Whether every further request of the pass is pointless
    pub fn is_run_fatal(&self) -> bool {
        match self {
            Termination::ApiError { code, .. } => code.is_run_fatal(),
            Termination::Shutdown => true,
            _ => false,
        }
    }

    /// Whether all pages were retrieved
    pub fn is_complete(&self) -> bool {
        matches!(self, Termination::Exhausted)
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Exhausted => write!(f, "exhausted"),
            Termination::ApiError { code, .. } => write!(f, "api error {code}"),
            Termination::RetriesExhausted { attempts } => {
                write!(f, "gave up after {attempts} attempts")
            }
            Termination::Shutdown => write!(f, "shutdown"),
            Termination::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome of paginating one subquery
#[derive(Debug, Clone, PartialEq)]
pub struct PageRun {
    /// Videos of every retrieved page, in page order
    pub entities: Vec<Entity>,
    /// Pages retrieved successfully
    pub pages: u32,
    /// Why the loop stopped
    pub termination: Termination,
}

/// Pages through the video query endpoint
pub struct Paginator<'a> {
    api: &'a dyn ResearchApi,
    gate: RetryGate,
    span: Span,
    page_size: u32,
}

impl<'a> Paginator<'a> {
    /// Paginator issuing requests through `api`, retried by `gate`,
    /// logging inside `span`
    pub fn new(api: &'a dyn ResearchApi, gate: RetryGate, span: Span) -> Self {
        Self {
            api,
            gate,
            span,
            page_size: PAGE_SIZE,
        }
    }

    /// Override `max_count`
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Fetch every page of `subquery`.
    ///
    /// Never fails: errors end up in [`PageRun::termination`] and the
    /// entities retrieved before the error are kept.
    pub async fn fetch_all(&self, subquery: &SubQuery) -> PageRun {
        let span = info_span!(
            parent: &self.span,
            "subquery",
            subquery = subquery.query_index + 1,
            window = %subquery.window,
        );
        self.collect(subquery).instrument(span).await
    }

    async fn collect(&self, subquery: &SubQuery) -> PageRun {
        let mut entities = Vec::new();
        let mut pages: u32 = 0;
        let mut cursor: Option<PageCursor> = None;

        let termination = loop {
            let mut body = subquery.to_body();
            if let Some(obj) = body.as_object_mut() {
                obj.insert("max_count".to_string(), json!(self.page_size));
            }
            if let Some(next) = &cursor {
                next.apply_to(&mut body);
            }

            let target = format!(
                "page {} of subquery {} window {}",
                pages + 1,
                subquery.query_index + 1,
                subquery.window
            );
            let api = self.api;
            let request = &body;

            let result = self
                .gate
                .run(&target, move || async move {
                    let page: VideoPage = api.post(Endpoint::VideoQuery, request).await?.into_data()?;
                    let next = page.next_cursor()?;
                    Ok((page.videos, next))
                })
                .await;

            match result {
                Ok((videos, next)) => {
                    pages += 1;
                    debug!(
                        page = pages,
                        videos = videos.len(),
                        has_more = next.is_some(),
                        "Page received"
                    );
                    entities.extend(videos);
                    match next {
                        Some(next) => cursor = Some(next),
                        None => break Termination::Exhausted,
                    }
                }
                Err(FetcherError::Api { code, message }) => {
                    warn!(code = %code, message = %message, "API returned error code, stopping subquery");
                    break Termination::ApiError { code, message };
                }
                Err(FetcherError::RetriesExhausted { attempts, .. }) => {
                    break Termination::RetriesExhausted { attempts };
                }
                Err(FetcherError::Shutdown) => {
                    info!("Shutdown requested, stopping subquery");
                    break Termination::Shutdown;
                }
                Err(other) => {
                    warn!(error = %other, "Page request failed, stopping subquery");
                    break Termination::Failed(other.to_string());
                }
            }
        };

        PageRun {
            entities,
            pages,
            termination,
        }
    }
}
