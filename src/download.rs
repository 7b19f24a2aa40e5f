//! Video URL validation and audio download through yt-dlp.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use crate::config::DownloadConfig;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("not a recognised YouTube video URL: {0}")]
    InvalidUrl(String),

    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ExitStatus {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("download timed out after {0}s")]
    Timeout(u64),

    #[error("downloader did not report an output file")]
    NoOutputPath,

    #[error("downloaded file {0} is missing or empty")]
    EmptyOutput(PathBuf),
}

/// Extract the 11-character video id from the common YouTube URL shapes:
/// `watch?v=ID`, `youtu.be/ID`, `/embed/ID` and `/shorts/ID`.
pub fn extract_video_id(video_url: &str) -> Result<String, DownloadError> {
    let invalid = || DownloadError::InvalidUrl(video_url.to_string());
    let url = Url::parse(video_url.trim()).map_err(|_| invalid())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }

    let host = url.host_str().ok_or_else(invalid)?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let host = host.strip_prefix("m.").unwrap_or(host);

    let candidate = match host {
        "youtu.be" => url.path_segments().and_then(|mut s| s.next()).map(str::to_string),
        "youtube.com" | "music.youtube.com" => {
            let mut segments = url.path_segments().ok_or_else(invalid)?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") | Some("shorts") | Some("live") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    };

    candidate
        .filter(|id| is_video_id(id))
        .ok_or_else(invalid)
}

fn is_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Fetches the audio track of a video into a directory
#[async_trait]
pub trait AudioDownloader: Send + Sync {
    async fn download_audio(&self, video_url: &str, work_dir: &Path) -> Result<PathBuf, DownloadError>;
}

/// AudioDownloader backed by yt-dlp
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    tool: String,
    audio_format: String,
    retries: u32,
    timeout: Duration,
}

impl YtDlpDownloader {
    pub fn new(config: &DownloadConfig) -> Self {
        Self {
            tool: config.tool.clone(),
            audio_format: config.audio_format.clone(),
            retries: config.retries,
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    fn build_args(&self, video_url: &str, work_dir: &Path) -> Vec<String> {
        vec![
            video_url.to_string(),
            "--no-playlist".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            self.audio_format.clone(),
            "--retries".to_string(),
            self.retries.to_string(),
            "--print".to_string(),
            "after_move:filepath".to_string(),
            "-o".to_string(),
            work_dir.join("source.%(ext)s").to_string_lossy().into_owned(),
        ]
    }
}

#[async_trait]
impl AudioDownloader for YtDlpDownloader {
    async fn download_audio(&self, video_url: &str, work_dir: &Path) -> Result<PathBuf, DownloadError> {
        let args = self.build_args(video_url, work_dir);
        info!("⬇️ Downloading audio: {}", video_url);
        debug!("{} {}", self.tool, args.join(" "));

        let mut cmd = Command::new(&self.tool);
        cmd.args(&args).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| DownloadError::Spawn {
                tool: self.tool.clone(),
                source,
            })?,
            Err(_) => return Err(DownloadError::Timeout(self.timeout.as_secs())),
        };

        if !output.status.success() {
            return Err(DownloadError::ExitStatus {
                tool: self.tool.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or(DownloadError::NoOutputPath)?;

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.len() > 0 => {
                info!("✅ Audio downloaded: {} ({} bytes)", path.display(), metadata.len());
                Ok(path)
            }
            _ => Err(DownloadError::EmptyOutput(path)),
        }
    }
}
