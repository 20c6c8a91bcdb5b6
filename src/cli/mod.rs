//! CLI command implementations

pub mod error;
pub mod lookup;
pub mod media;
pub mod videos;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::fetcher::auth::ClientCredentials;
use crate::fetcher::research_http::{build_http_client, HttpConnector, DEFAULT_API_BASE};
use crate::fetcher::retry::RetryPolicy;

pub use error::CliError;
pub use lookup::LookupArgs;
pub use media::MediaArgs;
pub use videos::VideosArgs;

/// Research Data Downloader CLI
#[derive(Parser, Debug)]
#[command(name = "research-data-downloader")]
#[command(about = "Collect videos, users and comments from the research API", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// API client key
    #[arg(long, global = true, env = "RESEARCH_CLIENT_KEY", hide_env_values = true)]
    pub client_key: Option<String>,

    /// API client secret
    #[arg(long, global = true, env = "RESEARCH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// API base URL
    #[arg(long, global = true, env = "RESEARCH_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Give up on a page after this many attempts (default: retry forever)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_page_attempts: Option<u32>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduled video collection described by a YAML file
    Videos(VideosArgs),

    /// Look up the profiles of the usernames in a videos CSV
    Users(LookupArgs),

    /// List the comments of the videos in a videos CSV
    Comments(LookupArgs),

    /// Download the video files of a videos CSV with yt-dlp
    Media(MediaArgs),
}

impl Cli {
    /// Connector authenticating with the configured client credentials
    pub fn connector(&self) -> Result<HttpConnector, CliError> {
        let (Some(key), Some(secret)) = (&self.client_key, &self.client_secret) else {
            return Err(CliError::MissingCredentials);
        };

        let client = build_http_client()?;
        let credentials = ClientCredentials::new(client.clone(), &self.api_base, key, secret);
        Ok(HttpConnector::new(client, &self.api_base, Arc::new(credentials)))
    }

    /// Page retry policy honoring `--max-page-attempts`
    pub fn page_policy(&self) -> RetryPolicy {
        RetryPolicy::unbounded().with_max_attempts(self.max_page_attempts)
    }
}
