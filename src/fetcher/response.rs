//! Research API response envelope and page payloads
//!
//! Every endpoint answers with `{"data": {...}, "error": {"code", "message",
//! "log_id"}}`. A code other than `ok` is an API-level rejection; a body that
//! does not match the expected shape is a parse failure and is retried.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::fetcher::{FetcherError, FetcherResult};
use crate::Entity;

/// Error code carried by every response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiErrorCode(String);

impl ApiErrorCode {
    /// Success code
    pub const OK: &'static str = "ok";
    /// Daily request quota used up
    pub const DAILY_QUOTA_LIMIT_EXCEEDED: &'static str = "daily_quota_limit_exceeded";
    /// Access token rejected
    pub const INVALID_TOKEN: &'static str = "invalid_token";
    /// Access token expired or malformed
    pub const ACCESS_TOKEN_INVALID: &'static str = "access_token_invalid";
    /// Client lacks the research scope
    pub const SCOPE_NOT_AUTHORIZED: &'static str = "scope_not_authorized";

    /// Raw code string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the request succeeded
    pub fn is_ok(&self) -> bool {
        self.0 == Self::OK
    }

    /// Whether the code makes every further request of the run pointless
    /// (quota exhausted or credentials rejected)
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::DAILY_QUOTA_LIMIT_EXCEEDED
                | Self::INVALID_TOKEN
                | Self::ACCESS_TOKEN_INVALID
                | Self::SCOPE_NOT_AUTHORIZED
        )
    }
}

impl From<&str> for ApiErrorCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `error` object of the envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Error code (`ok` on success)
    pub code: ApiErrorCode,
    /// Error message
    #[serde(default)]
    pub message: String,
    /// Server-side log id for support requests
    #[serde(default)]
    pub log_id: String,
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiResponse {
    /// Status of the request
    pub error: ApiErrorBody,
    /// Endpoint-specific payload
    #[serde(default)]
    pub data: Value,
}

impl ApiResponse {
    /// Parse a raw response body
    pub fn from_body(body: &str) -> FetcherResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| FetcherError::Parse(format!("Failed to decode response envelope: {e}")))
    }

    /// Successful envelope with the given payload
    pub fn ok(data: Value) -> Self {
        Self {
            error: ApiErrorBody {
                code: ApiErrorCode::from(ApiErrorCode::OK),
                message: String::new(),
                log_id: String::new(),
            },
            data,
        }
    }

    /// Rejected envelope with the given code
    pub fn rejected(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorBody {
                code: ApiErrorCode::from(code),
                message: message.into(),
                log_id: String::new(),
            },
            data: json!({}),
        }
    }

    /// Decode the payload, or surface a non-"ok" code as [`FetcherError::Api`]
    pub fn into_data<T: DeserializeOwned>(self) -> FetcherResult<T> {
        if !self.error.code.is_ok() {
            return Err(FetcherError::Api {
                code: self.error.code,
                message: self.error.message,
            });
        }

        serde_json::from_value(self.data)
            .map_err(|e| FetcherError::Parse(format!("Unexpected response payload: {e}")))
    }
}

/// Pagination cursor value; the API returns integers but strings are tolerated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CursorValue {
    /// Numeric offset
    Offset(i64),
    /// Opaque token
    Token(String),
}

/// Continuation marker for the next page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageCursor {
    /// Search session id (video query only)
    pub search_id: Option<String>,
    /// Offset or token of the next page
    pub cursor: Option<CursorValue>,
}

impl PageCursor {
    /// Copy the cursor fields into a request body
    pub fn apply_to(&self, body: &mut Value) {
        if let Some(obj) = body.as_object_mut() {
            if let Some(search_id) = &self.search_id {
                obj.insert("search_id".to_string(), json!(search_id));
            }
            if let Some(cursor) = &self.cursor {
                obj.insert("cursor".to_string(), json!(cursor));
            }
        }
    }
}

/// `data` of the video query endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoPage {
    /// Videos on this page
    #[serde(default)]
    pub videos: Vec<Entity>,
    /// Whether another page exists
    pub has_more: bool,
    /// Search session id
    #[serde(default)]
    pub search_id: Option<String>,
    /// Cursor of the next page
    #[serde(default)]
    pub cursor: Option<CursorValue>,
}

impl VideoPage {
    /// Cursor for the next page, `None` on the last page.
    ///
    /// # Errors
    /// A page that claims more results without a cursor is malformed.
    pub fn next_cursor(&self) -> FetcherResult<Option<PageCursor>> {
        next_cursor(self.has_more, self.search_id.clone(), self.cursor.clone())
    }
}

/// `data` of the comment list endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentPage {
    /// Comments on this page
    #[serde(default)]
    pub comments: Vec<Entity>,
    /// Whether another page exists
    pub has_more: bool,
    /// Cursor of the next page
    #[serde(default)]
    pub cursor: Option<CursorValue>,
}

impl CommentPage {
    /// Cursor for the next page, `None` on the last page
    pub fn next_cursor(&self) -> FetcherResult<Option<PageCursor>> {
        next_cursor(self.has_more, None, self.cursor.clone())
    }
}

fn next_cursor(
    has_more: bool,
    search_id: Option<String>,
    cursor: Option<CursorValue>,
) -> FetcherResult<Option<PageCursor>> {
    if !has_more {
        return Ok(None);
    }
    if search_id.is_none() && cursor.is_none() {
        return Err(FetcherError::Parse(
            "has_more is true but no cursor was returned".to_string(),
        ));
    }
    Ok(Some(PageCursor { search_id, cursor }))
}
