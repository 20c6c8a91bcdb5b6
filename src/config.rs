//! YAML collection configuration
//!
//! ```yaml
//! out_base: data/climate
//! d_start: 2024-01-01
//! d_end: 2024-03-01
//! increment: 30
//! field_names: [keyword]
//! field_values: [climate, flood]
//! schedule: daily
//! total: 7
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::downloader::config::MAX_WINDOW_DAYS;
use crate::downloader::schedule::Schedule;
use crate::query::{build_base_queries, window_count, FieldValues, FilterExpression, QueryError};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config: {0}")]
    Io(String),

    /// File is not valid YAML for this schema
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Values are out of range or inconsistent
    #[error("invalid config: {0}")]
    Invalid(String),

    /// Filter fields cannot be partitioned
    #[error("invalid query fields: {0}")]
    Query(#[from] QueryError),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// One scheduled video collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Output path prefix; passes write `{out_base}_{stamp}.csv`
    pub out_base: String,
    /// First day of the range (inclusive)
    pub d_start: NaiveDate,
    /// End of the range (exclusive)
    pub d_end: NaiveDate,
    /// Window length in days (1..=30)
    pub increment: u32,
    /// One or two filter field names
    pub field_names: Vec<String>,
    /// Values for the filter fields
    pub field_values: FieldValues,
    /// Wait between passes
    pub schedule: Schedule,
    /// Number of passes
    pub total: u32,
}

impl CollectionConfig {
    /// Read, parse and validate a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate YAML text
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and that the filter fields can be partitioned
    pub fn validate(&self) -> ConfigResult<()> {
        if self.out_base.trim().is_empty() {
            return Err(ConfigError::Invalid("out_base must not be empty".to_string()));
        }
        if self.increment == 0 || self.increment > MAX_WINDOW_DAYS {
            return Err(ConfigError::Invalid(format!(
                "increment must be between 1 and {} days, got {}",
                MAX_WINDOW_DAYS, self.increment
            )));
        }
        if self.d_start >= self.d_end {
            return Err(ConfigError::Invalid(format!(
                "d_start ({}) must be before d_end ({})",
                self.d_start, self.d_end
            )));
        }
        if self.total == 0 {
            return Err(ConfigError::Invalid("total must be at least 1".to_string()));
        }
        self.base_queries()?;
        Ok(())
    }

    /// Base filter expressions for the configured fields
    pub fn base_queries(&self) -> ConfigResult<Vec<FilterExpression>> {
        Ok(build_base_queries(&self.field_names, &self.field_values)?)
    }

    /// Number of date windows per base query
    pub fn windows_per_query(&self) -> usize {
        window_count(self.d_start, self.d_end, self.increment)
    }
}
