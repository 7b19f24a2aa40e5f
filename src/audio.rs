use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::AudioConfig;
use crate::planner::SegmentBoundary;

/// Failure of a single ffmpeg/ffprobe invocation
#[derive(Debug, Error)]
pub enum MediaToolError {
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

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("unexpected tool output: {0}")]
    InvalidOutput(String),
}

/// Failure to produce one segment file
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("segment {index}: {source}")]
    ToolFailed {
        index: usize,
        #[source]
        source: MediaToolError,
    },

    #[error("segment {index}: no output written to {path}")]
    MissingOutput { index: usize, path: PathBuf },

    #[error("segment {index}: {size_bytes} bytes exceeds the {limit_bytes} byte upload limit")]
    Oversized {
        index: usize,
        size_bytes: u64,
        limit_bytes: u64,
    },
}

/// Codec settings for segment files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentEncoding {
    pub codec: String,
    pub bitrate: String,
    pub extension: String,
}

impl Default for SegmentEncoding {
    fn default() -> Self {
        Self {
            codec: "libmp3lame".to_string(),
            bitrate: "64k".to_string(),
            extension: "mp3".to_string(),
        }
    }
}

impl From<&AudioConfig> for SegmentEncoding {
    fn from(config: &AudioConfig) -> Self {
        Self {
            codec: config.segment_codec.clone(),
            bitrate: config.segment_bitrate.clone(),
            extension: config.segment_extension.clone(),
        }
    }
}

/// Probing and cutting of local audio files
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Duration of the media file in seconds
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaToolError>;

    /// Re-encode `[start, start + length)` of `source` into `output`
    async fn cut_segment(
        &self,
        source: &Path,
        start_seconds: f64,
        length_seconds: f64,
        encoding: &SegmentEncoding,
        output: &Path,
    ) -> Result<(), MediaToolError>;
}

/// MediaToolkit backed by the ffmpeg and ffprobe executables
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
}

impl FfmpegToolkit {
    pub fn new(ffmpeg_path: impl Into<String>, ffprobe_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    pub fn from_config(config: &AudioConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
            Duration::from_secs(config.tool_timeout_seconds),
        )
    }

    async fn run(&self, tool: &str, args: &[String]) -> Result<Output, MediaToolError> {
        debug!("🔧 {} {}", tool, args.join(" "));

        let mut cmd = Command::new(tool);
        cmd.args(args).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| MediaToolError::Spawn {
                tool: tool.to_string(),
                source,
            })?,
            Err(_) => {
                return Err(MediaToolError::Timeout {
                    tool: tool.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(MediaToolError::ExitStatus {
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe_duration(&self, path: &Path) -> Result<f64, MediaToolError> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        let output = self.run(&self.ffprobe_path, &args).await?;
        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn cut_segment(
        &self,
        source: &Path,
        start_seconds: f64,
        length_seconds: f64,
        encoding: &SegmentEncoding,
        output: &Path,
    ) -> Result<(), MediaToolError> {
        let args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-ss".to_string(),
            format!("{:.3}", start_seconds),
            "-t".to_string(),
            format!("{:.3}", length_seconds),
            "-i".to_string(),
            source.to_string_lossy().into_owned(),
            "-vn".to_string(),
            "-acodec".to_string(),
            encoding.codec.clone(),
            "-b:a".to_string(),
            encoding.bitrate.clone(),
            output.to_string_lossy().into_owned(),
        ];
        self.run(&self.ffmpeg_path, &args).await?;
        Ok(())
    }
}

/// Parse ffprobe's bare `format=duration` output
pub fn parse_probe_output(stdout: &str) -> Result<f64, MediaToolError> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    line.parse::<f64>()
        .map_err(|_| MediaToolError::InvalidOutput(format!("duration '{}'", line)))
}

/// A segment file ready for upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Result of cutting one boundary
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedSegment {
    Ready(SegmentFile),
    /// Cut succeeded but the file is too small to be worth transcribing
    Skipped { path: PathBuf, size_bytes: u64 },
}

/// What the orchestrator gets for each boundary
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentInput {
    Ready(SegmentFile),
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSegment {
    pub boundary: SegmentBoundary,
    pub input: SegmentInput,
}

/// Cuts planned boundaries out of a source file into a work directory
pub struct SegmentExtractor {
    toolkit: Arc<dyn MediaToolkit>,
    work_dir: PathBuf,
    encoding: SegmentEncoding,
    min_segment_bytes: u64,
    max_segment_bytes: u64,
    concurrency: usize,
}

impl SegmentExtractor {
    pub fn new(toolkit: Arc<dyn MediaToolkit>, work_dir: impl Into<PathBuf>, config: &AudioConfig) -> Self {
        Self {
            toolkit,
            work_dir: work_dir.into(),
            encoding: SegmentEncoding::from(config),
            min_segment_bytes: config.min_segment_bytes,
            max_segment_bytes: config.max_segment_bytes,
            concurrency: config.extraction_concurrency.max(1),
        }
    }

    fn segment_path(&self, boundary: &SegmentBoundary) -> PathBuf {
        self.work_dir
            .join(format!("segment_{:04}.{}", boundary.index, self.encoding.extension))
    }

    /// Cut one boundary into its own file
    pub async fn extract(
        &self,
        source: &Path,
        boundary: &SegmentBoundary,
    ) -> Result<ExtractedSegment, ExtractionError> {
        let output = self.segment_path(boundary);

        if let Err(source_err) = self
            .toolkit
            .cut_segment(
                source,
                boundary.start_seconds,
                boundary.duration_seconds(),
                &self.encoding,
                &output,
            )
            .await
        {
            remove_partial(&output).await;
            return Err(ExtractionError::ToolFailed {
                index: boundary.index,
                source: source_err,
            });
        }

        let size_bytes = match tokio::fs::metadata(&output).await {
            Ok(metadata) => metadata.len(),
            Err(_) => {
                return Err(ExtractionError::MissingOutput {
                    index: boundary.index,
                    path: output,
                })
            }
        };

        if size_bytes > self.max_segment_bytes {
            remove_partial(&output).await;
            return Err(ExtractionError::Oversized {
                index: boundary.index,
                size_bytes,
                limit_bytes: self.max_segment_bytes,
            });
        }

        if size_bytes < self.min_segment_bytes {
            warn!(
                "⏭️ Segment {} is only {} bytes (minimum {}), skipping",
                boundary.index, size_bytes, self.min_segment_bytes
            );
            return Ok(ExtractedSegment::Skipped {
                path: output,
                size_bytes,
            });
        }

        debug!("Segment {} ready: {} ({} bytes)", boundary.index, output.display(), size_bytes);
        Ok(ExtractedSegment::Ready(SegmentFile {
            path: output,
            size_bytes,
        }))
    }

    /// Cut every boundary with bounded parallelism, keeping boundary order
    pub async fn extract_all(&self, source: &Path, boundaries: &[SegmentBoundary]) -> Vec<PreparedSegment> {
        info!(
            "✂️ Extracting {} segments ({} at a time)",
            boundaries.len(),
            self.concurrency
        );

        let prepared: Vec<PreparedSegment> = stream::iter(boundaries.iter().copied())
            .map(move |boundary| async move {
                let input = match self.extract(source, &boundary).await {
                    Ok(ExtractedSegment::Ready(file)) => SegmentInput::Ready(file),
                    Ok(ExtractedSegment::Skipped { size_bytes, .. }) => SegmentInput::Skipped {
                        reason: format!(
                            "{} bytes is below the {} byte minimum",
                            size_bytes, self.min_segment_bytes
                        ),
                    },
                    Err(e) => {
                        warn!("❌ Extraction failed: {}", e);
                        SegmentInput::Failed {
                            reason: e.to_string(),
                        }
                    }
                };
                PreparedSegment { boundary, input }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let ready = prepared
            .iter()
            .filter(|p| matches!(p.input, SegmentInput::Ready(_)))
            .count();
        info!("✅ {}/{} segments ready for transcription", ready, prepared.len());

        prepared
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial segment {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial segment {}: {}", path.display(), e),
    }
}
