//! Per-entity lookups: user profiles and video comments
//!
//! Lookups run one entity at a time under the bounded retry policy. An entity
//! whose lookup keeps failing is recorded as an error marker
//! (`{<id field>: id, "error": ...}`) and the batch moves on; a run-fatal API
//! code (quota, credentials) stops the whole batch.

use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument, Span};

use crate::accumulator::ResultAccumulator;
use crate::downloader::config::{LOOKUP_PAUSE, PAGE_SIZE};
use crate::fetcher::pagination::Termination;
use crate::fetcher::response::{CommentPage, PageCursor};
use crate::fetcher::retry::{RetryGate, RetryPolicy};
use crate::fetcher::{Endpoint, FetcherError, ResearchApi};
use crate::metrics;
use crate::{Entity, EntityKind};

/// Marker text for a lookup that never got a usable response
pub const NO_DATA_MESSAGE: &str = "no data in response after 5 attempts";

/// Outcome of a batch of lookups
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRun {
    /// Looked-up entities and error markers, in input order
    pub entities: Vec<Entity>,
    /// Number of error markers among `entities`
    pub errors: usize,
    /// Set when the batch stopped before the last input
    pub stopped: Option<Termination>,
}

enum Outcome {
    Continue,
    Stop(Termination),
}

/// Sequential user-info and comment lookups
pub struct EntityLookup<'a> {
    api: &'a dyn ResearchApi,
    gate: RetryGate,
    span: Span,
    pause: Duration,
}

impl<'a> EntityLookup<'a> {
    /// Lookups through `api` with the default bounded policy
    pub fn new(api: &'a dyn ResearchApi, span: Span) -> Self {
        Self {
            api,
            gate: RetryGate::new(RetryPolicy::bounded()),
            span,
            pause: LOOKUP_PAUSE,
        }
    }

    /// Replace the retry gate
    pub fn with_gate(mut self, gate: RetryGate) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the pause between user lookups
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Look up the profile of every username, in order.
    ///
    /// Each successful row is the response `data` with `username` added.
    pub async fn user_info(&self, usernames: &[String]) -> LookupRun {
        let span = info_span!(parent: &self.span, "user_info", users = usernames.len());
        self.collect_users(usernames).instrument(span).await
    }

    async fn collect_users(&self, usernames: &[String]) -> LookupRun {
        let mut results = ResultAccumulator::new(EntityKind::User);
        let mut errors = 0;
        let mut stopped = None;
        let total = usernames.len();

        for (position, username) in usernames.iter().enumerate() {
            let body = json!({ "username": username });
            let target = format!("user {username}");
            let api = self.api;
            let request = &body;

            let result = self
                .gate
                .run(&target, move || async move {
                    api.post(Endpoint::UserInfo, request)
                        .await?
                        .into_data::<Entity>()
                })
                .await;

            let outcome = match result {
                Ok(profile) => {
                    results.add([profile.with("username", username.as_str())]);
                    Outcome::Continue
                }
                Err(error) => {
                    self.record_failure(&mut results, &mut errors, EntityKind::User, username, error)
                }
            };

            info!("user {} of {}: {}", position + 1, total, username);

            if let Outcome::Stop(reason) = outcome {
                stopped = Some(reason);
                break;
            }

            if position + 1 < total && !self.gate.pause(self.pause).await {
                stopped = Some(Termination::Shutdown);
                break;
            }
        }

        metrics::record_entities("user", results.len().saturating_sub(errors));
        LookupRun {
            entities: results.finalize(),
            errors,
            stopped,
        }
    }

    /// List the comments of every video id, paging each video to the end.
    ///
    /// Comments are deduplicated by `id`.
    pub async fn comments(&self, video_ids: &[String]) -> LookupRun {
        let span = info_span!(parent: &self.span, "comments", videos = video_ids.len());
        self.collect_comments(video_ids).instrument(span).await
    }

    async fn collect_comments(&self, video_ids: &[String]) -> LookupRun {
        let mut results = ResultAccumulator::new(EntityKind::Comment);
        let mut errors = 0;
        let mut stopped = None;
        let total = video_ids.len();

        'videos: for (position, video_id) in video_ids.iter().enumerate() {
            let mut cursor: Option<PageCursor> = None;
            let mut page: u32 = 0;

            loop {
                page += 1;
                let mut body = json!({
                    "video_id": video_id_value(video_id),
                    "max_count": PAGE_SIZE,
                });
                if let Some(next) = &cursor {
                    next.apply_to(&mut body);
                }
                let target = format!("comments page {page} of video {video_id}");
                let api = self.api;
                let request = &body;

                let result = self
                    .gate
                    .run(&target, move || async move {
                        let listing: CommentPage =
                            api.post(Endpoint::CommentList, request).await?.into_data()?;
                        let next = listing.next_cursor()?;
                        Ok((listing.comments, next))
                    })
                    .await;

                match result {
                    Ok((comments, next)) => {
                        results.add(comments);
                        match next {
                            Some(next) => cursor = Some(next),
                            None => break,
                        }
                    }
                    Err(error) => {
                        let outcome = self.record_failure(
                            &mut results,
                            &mut errors,
                            EntityKind::Comment,
                            video_id,
                            error,
                        );
                        if let Outcome::Stop(reason) = outcome {
                            stopped = Some(reason);
                            break 'videos;
                        }
                        break;
                    }
                }
            }

            info!("video {} of {}: {}", position + 1, total, video_id);
        }

        metrics::record_entities("comment", results.len().saturating_sub(errors));
        LookupRun {
            entities: results.finalize(),
            errors,
            stopped,
        }
    }

    fn record_failure(
        &self,
        results: &mut ResultAccumulator,
        errors: &mut usize,
        kind: EntityKind,
        identifier: &str,
        error: FetcherError,
    ) -> Outcome {
        let id_field = match kind {
            EntityKind::Comment => "video_id",
            other => other.id_field(),
        };

        let message = match error {
            FetcherError::Shutdown => return Outcome::Stop(Termination::Shutdown),
            FetcherError::Api { code, message } if code.is_run_fatal() => {
                warn!(code = %code, "{} lookup stopped at {}: {}", kind, identifier, message);
                return Outcome::Stop(Termination::ApiError { code, message });
            }
            FetcherError::Api { code, message } => format!("API error {code}: {message}"),
            FetcherError::RetriesExhausted { .. } => NO_DATA_MESSAGE.to_string(),
            other => other.to_string(),
        };

        warn!("{} lookup failed for {}: {}", kind, identifier, message);
        metrics::record_lookup_error(&kind.to_string());
        results.add([Entity::error_marker(id_field, identifier, message)]);
        *errors += 1;
        Outcome::Continue
    }
}

/// Video ids are numeric on the wire; anything else is sent verbatim
fn video_id_value(video_id: &str) -> Value {
    match video_id.parse::<i64>() {
        Ok(id) => json!(id),
        Err(_) => json!(video_id),
    }
}
