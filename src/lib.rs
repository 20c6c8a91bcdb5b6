//! # Research Data Downloader Library
//!
//! A sequential collector for the cursor-paginated research API (video search,
//! user info, comment listing). Designed for long-running, scheduled data
//! collection under strict rate limits.
//!
//! ## Features
//!
//! - **Query Partitioning**: Expands one or two filter fields into base queries
//! - **Date Windows**: Splits long date ranges into API-sized sub-windows
//! - **Cursor Pagination**: Follows `search_id`/`cursor` until `has_more` is false
//! - **Fixed-Interval Retry**: Unbounded retry for pages, bounded retry for lookups
//! - **Deduplication**: First-seen-wins merge by entity identifier
//! - **Scheduling**: Hourly or daily repetition of a full collection pass
//!
//! ## Quick Start
//!
//! ```no_run
//! use research_data_downloader::config::CollectionConfig;
//! use research_data_downloader::downloader::CollectionRunner;
//! use research_data_downloader::fetcher::research_http::HttpConnector;
//! use std::sync::Arc;
//!
//! # async fn example(connector: HttpConnector) -> Result<(), Box<dyn std::error::Error>> {
//! let config = CollectionConfig::load("collect.yaml")?;
//! let runner = CollectionRunner::new(Arc::new(connector));
//! let passes = runner.run(&config).await?;
//! println!("completed {} passes", passes.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`query`] - Filter expressions, base-query partitioning and date windows
//! - [`fetcher`] - API transport, credentials, retry gate, pagination and lookups
//! - [`accumulator`] - Deduplicating result accumulator
//! - [`downloader`] - Collection passes and the scheduled run loop
//! - [`output`] - CSV persistence and run file naming
//! - [`config`] - YAML collection configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Deduplicating result accumulator
pub mod accumulator;

/// CLI command implementations
pub mod cli;

/// YAML collection configuration
pub mod config;

/// Collection passes, schedule waits and media downloads
pub mod downloader;

/// API transport, pagination and retry
pub mod fetcher;

/// Prometheus metrics
pub mod metrics;

/// Data output writers
pub mod output;

/// Filter expressions and date windows
pub mod query;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

pub use accumulator::ResultAccumulator;
pub use query::{DateWindow, FilterExpression, SubQuery};

/// Kind of entity returned by the research API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Video returned by the video query endpoint
    Video,
    /// User profile returned by the user info endpoint
    User,
    /// Comment returned by the comment list endpoint
    Comment,
}

impl EntityKind {
    /// Field holding the unique identifier for this kind
    pub fn id_field(&self) -> &'static str {
        match self {
            EntityKind::Video | EntityKind::Comment => "id",
            EntityKind::User => "username",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::Video => "video",
            EntityKind::User => "user",
            EntityKind::Comment => "comment",
        };
        write!(f, "{s}")
    }
}

/// A record returned by the API, kept as an ordered field map.
///
/// Field order follows the response, which in turn drives CSV column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

impl Entity {
    /// Create an empty entity
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Insert or replace a field value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Builder-style [`Entity::insert`]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Iterate over fields in insertion order
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Identifier of this entity for the given kind, rendered as a string.
    ///
    /// Numeric ids are rendered without quotes so `1` and `"1"` collide.
    pub fn identifier(&self, kind: EntityKind) -> Option<String> {
        match self.0.get(kind.id_field())? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Build the marker recorded when a per-entity lookup gives up
    pub fn error_marker(
        id_field: &str,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new()
            .with(id_field, identifier.into())
            .with("error", message.into())
    }

    /// Whether this entity is an error marker rather than API data
    pub fn is_error_marker(&self) -> bool {
        self.0.contains_key("error")
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
