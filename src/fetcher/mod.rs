//! Research API fetchers
//!
//! The engine talks to the API only through [`ResearchApi`]: one POST of a
//! JSON body to one of three fixed endpoints, answered by an
//! `{error: {code}, data: {...}}` envelope. The HTTP implementation lives in
//! [`research_http`]; tests substitute scripted fakes.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub mod auth;
pub mod lookup;
pub mod pagination;
pub mod research_http;
pub mod response;
pub mod retry;
pub mod retry_formatter;

pub use response::{ApiErrorCode, ApiResponse};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Request could not be sent or the connection failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// The API answered with a non-"ok" error code
    #[error("API error {code}: {message}")]
    Api {
        /// Error code reported by the API
        code: ApiErrorCode,
        /// Human-readable message from the API, possibly empty
        message: String,
    },

    /// Access token could not be obtained
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The retry policy gave up
    #[error("no data after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first
        attempts: u32,
        /// Error of the final attempt
        last_error: String,
    },

    /// Shutdown requested while waiting to retry
    #[error("shutdown requested")]
    Shutdown,
}

impl FetcherError {
    /// Whether the failure is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, FetcherError::Transport(_) | FetcherError::Parse(_))
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Research API endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Video search
    VideoQuery,
    /// User profile lookup
    UserInfo,
    /// Comments of one video
    CommentList,
}

impl Endpoint {
    /// Path below `/v2/research/`
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::VideoQuery => "video/query",
            Endpoint::UserInfo => "user/info",
            Endpoint::CommentList => "video/comment/list",
        }
    }

    /// Comma-separated field list requested from the endpoint
    pub fn fields(&self) -> &'static str {
        match self {
            Endpoint::VideoQuery => {
                "id,video_description,create_time,region_code,share_count,view_count,\
                 like_count,comment_count,music_id,hashtag_names,username,effect_ids,\
                 playlist_id,voice_to_text"
            }
            Endpoint::UserInfo => {
                "display_name,bio_description,avatar_url,is_verified,follower_count,\
                 following_count,likes_count,video_count"
            }
            Endpoint::CommentList => {
                "id,video_id,text,like_count,reply_count,parent_comment_id,create_time"
            }
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Transport seam for the research API
#[async_trait]
pub trait ResearchApi: Send + Sync {
    /// POST `body` to `endpoint` and decode the response envelope.
    ///
    /// Transport failures and undecodable bodies are returned as
    /// [`FetcherError::Transport`] / [`FetcherError::Parse`]; API-level error
    /// codes are carried inside the returned [`ApiResponse`].
    async fn post(&self, endpoint: Endpoint, body: &Value) -> FetcherResult<ApiResponse>;
}

/// Produces an authenticated API session, once per collection pass
#[async_trait]
pub trait ApiConnector: Send + Sync {
    /// Obtain credentials and return a ready-to-use API handle
    async fn connect(&self) -> FetcherResult<Arc<dyn ResearchApi>>;
}
