//! `media` command: download video files

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use super::CliError;
use crate::downloader::media::{MediaDownloader, MediaSummary};
use crate::output::read_column;
use crate::shutdown::SharedShutdown;

/// Arguments of the `media` command
#[derive(Parser, Debug)]
pub struct MediaArgs {
    /// Videos CSV produced by the `videos` command
    #[arg(long)]
    pub input: PathBuf,

    /// Directory receiving `{id}.mp4` files
    #[arg(long)]
    pub output_dir: PathBuf,
}

impl MediaArgs {
    /// Download every video listed in the input
    pub async fn execute(&self, shutdown: SharedShutdown) -> Result<MediaSummary, CliError> {
        let ids = read_column(&self.input, "id")?;
        let downloader = MediaDownloader::locate(&self.output_dir)?.with_shutdown(shutdown);

        let summary = downloader.download_all(&ids).await?;

        if !summary.failed.is_empty() {
            warn!("{} downloads failed: {}", summary.failed.len(), summary.failed.join(", "));
        }
        info!(
            "media done: {} downloaded, {} already present -> {}",
            summary.downloaded,
            summary.skipped,
            self.output_dir.display()
        );
        Ok(summary)
    }
}
