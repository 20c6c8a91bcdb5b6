//! Video file downloads through the external `yt-dlp` tool
//!
//! Downloads run one at a time; a failing video is logged and skipped.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::downloader::DownloadError;
use crate::shutdown::SharedShutdown;

/// Video page URL prefix handed to `yt-dlp`
const VIDEO_PAGE_PREFIX: &str = "https://www.tiktok.com/@/video/";

/// Outcome of a media batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaSummary {
    /// Videos downloaded in this run
    pub downloaded: usize,
    /// Videos already present in the output directory
    pub skipped: usize,
    /// Ids whose download failed
    pub failed: Vec<String>,
}

/// Sequential `yt-dlp` runner
#[derive(Debug, Clone)]
pub struct MediaDownloader {
    program: PathBuf,
    output_dir: PathBuf,
    shutdown: Option<SharedShutdown>,
}

impl MediaDownloader {
    /// Find `yt-dlp` on `PATH`
    pub fn locate(output_dir: impl Into<PathBuf>) -> Result<Self, DownloadError> {
        let program = which::which("yt-dlp")
            .map_err(|_| DownloadError::Tool("yt-dlp not found on PATH".to_string()))?;
        Ok(Self::with_program(program, output_dir))
    }

    /// Use an explicit downloader executable
    pub fn with_program(program: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
            shutdown: None,
        }
    }

    /// Stop between videos once shutdown is requested
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Page URL of a video
    pub fn video_url(video_id: &str) -> String {
        format!("{VIDEO_PAGE_PREFIX}{video_id}")
    }

    /// Target file of a video
    pub fn output_path(&self, video_id: &str) -> PathBuf {
        self.output_dir.join(format!("{video_id}.mp4"))
    }

    /// Download every video id in order
    pub async fn download_all(&self, video_ids: &[String]) -> Result<MediaSummary, DownloadError> {
        tokio::fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            DownloadError::Tool(format!(
                "failed to create {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        let mut summary = MediaSummary::default();
        for (position, video_id) in video_ids.iter().enumerate() {
            if self.shutdown.as_ref().is_some_and(|s| s.is_shutdown_requested()) {
                info!("Shutdown requested, stopping media downloads");
                break;
            }

            let target = self.output_path(video_id);
            if target.exists() {
                debug!("{} already present, skipping", target.display());
                summary.skipped += 1;
                continue;
            }

            match self.download_one(video_id, &target).await {
                Ok(()) => summary.downloaded += 1,
                Err(message) => {
                    warn!("video {} failed: {}", video_id, message);
                    summary.failed.push(video_id.clone());
                }
            }
            info!("video {} of {}: {}", position + 1, video_ids.len(), video_id);
        }

        Ok(summary)
    }

    async fn download_one(&self, video_id: &str, target: &Path) -> Result<(), String> {
        let url = Self::video_url(video_id);
        info!("Downloading video from {} to {}", url, target.display());

        let output = Command::new(&self.program)
            .arg(&url)
            .arg("-o")
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| format!("failed to run {}: {}", self.program.display(), e))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("downloader stderr: {}", stderr);
        Err(stderr
            .lines()
            .last()
            .unwrap_or("unknown error")
            .to_string())
    }
}
