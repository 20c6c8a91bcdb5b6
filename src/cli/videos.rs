//! `videos` command: scheduled video collection

use chrono::NaiveDateTime;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{Cli, CliError};
use crate::config::CollectionConfig;
use crate::downloader::{CollectionRunner, PassSummary};
use crate::output::run_output_path;
use crate::shutdown::SharedShutdown;

/// Arguments of the `videos` command
#[derive(Parser, Debug)]
pub struct VideosArgs {
    /// YAML collection config
    pub config: PathBuf,

    /// Run every pass back to back without waiting for the schedule
    #[arg(long, default_value_t = false)]
    pub test: bool,
}

impl VideosArgs {
    /// Load and validate the collection config
    pub fn load_config(&self) -> Result<CollectionConfig, CliError> {
        Ok(CollectionConfig::load(&self.config)?)
    }

    /// JSON log file of a run started at `started`
    pub fn log_path(config: &CollectionConfig, started: NaiveDateTime) -> PathBuf {
        run_output_path(&config.out_base, started, "log")
    }

    /// Run the collection
    pub async fn execute(
        &self,
        cli: &Cli,
        config: &CollectionConfig,
        shutdown: SharedShutdown,
    ) -> Result<Vec<PassSummary>, CliError> {
        info!(
            "YAML file {} started (test mode: {})",
            self.config.display(),
            self.test
        );

        let runner = CollectionRunner::new(Arc::new(cli.connector()?))
            .with_page_policy(cli.page_policy())
            .with_shutdown(shutdown)
            .with_test_mode(self.test);

        let passes = runner.run(config).await?;

        for pass in &passes {
            info!(
                "pass {}: {} videos -> {}{}",
                pass.repeat,
                pass.videos,
                pass.output.display(),
                pass.stopped
                    .as_ref()
                    .map(|s| format!(" (stopped: {s})"))
                    .unwrap_or_default()
            );
        }
        info!("YAML file processed successfully: {}", self.config.display());
        Ok(passes)
    }
}
