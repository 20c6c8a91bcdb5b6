//! CLI error types and conversions

use crate::config::ConfigError;
use crate::downloader::DownloadError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;

/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for every other failure
pub const EXIT_FAILURE: i32 = 1;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Download error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Fetcher error
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),

    /// Output error
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Client key or secret not supplied
    #[error("missing credentials: set --client-key/--client-secret or RESEARCH_CLIENT_KEY/RESEARCH_CLIENT_SECRET")]
    MissingCredentials,
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Download(DownloadError::Config(_)) => EXIT_CONFIG,
            _ => EXIT_FAILURE,
        }
    }
}
