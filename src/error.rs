//! Error types for the transcription pipeline.
//!
//! Per-stage errors live next to the code that raises them and are
//! re-exported here. `PipelineError` is what a caller of
//! [`crate::pipeline::Pipeline`] sees: only failures that end the run.

use thiserror::Error;

pub use crate::audio::{ExtractionError, MediaToolError};
pub use crate::download::DownloadError;
pub use crate::planner::PlanError;
pub use crate::transcription::orchestrator::OrchestrationError;
pub use crate::transcription::timecode::TimestampError;
pub use crate::transcription::whisper::TranscriptionError;

/// Fatal pipeline failure
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The URL is not a recognised video URL; nothing was started.
    #[error("Invalid video URL: {0}")]
    InvalidUrl(String),

    /// The audio track could not be fetched.
    #[error("Download failed: {reason} ({suggestion})")]
    DownloadFailed { reason: String, suggestion: String },

    /// The downloaded audio has no usable duration.
    #[error("Could not read audio duration: {reason} ({suggestion})")]
    ProbeFailed { reason: String, suggestion: String },

    /// The run was cancelled.
    #[error("Transcription cancelled")]
    Cancelled,

    /// The pipeline was built with settings it cannot run with.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The per-run work directory could not be created.
    #[error("Work directory error: {0}")]
    Workspace(#[source] std::io::Error),

    /// Every segment failed or was skipped and empty transcripts are treated as errors.
    #[error("No segment produced any subtitle ({failed} failed, {skipped} skipped)")]
    NothingTranscribed { failed: usize, skipped: usize },
}

impl PipelineError {
    pub fn download_failed(error: &DownloadError) -> Self {
        let suggestion = match error {
            DownloadError::InvalidUrl(_) => "check the video URL",
            DownloadError::Spawn { .. } => "verify that yt-dlp is installed and on PATH",
            DownloadError::Timeout(_) => "retry, or raise download.timeout_seconds",
            DownloadError::ExitStatus { .. } => {
                "check that the video is public and update yt-dlp (yt-dlp -U)"
            }
            DownloadError::NoOutputPath | DownloadError::EmptyOutput(_) => {
                "update yt-dlp and check that the video has an audio track"
            }
        };
        Self::DownloadFailed {
            reason: error.to_string(),
            suggestion: suggestion.to_string(),
        }
    }

    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
            suggestion: "verify that ffprobe is installed and the downloaded file is valid audio"
                .to_string(),
        }
    }
}

impl From<PlanError> for PipelineError {
    fn from(error: PlanError) -> Self {
        match error {
            PlanError::InvalidChunkLength => Self::InvalidConfig(error.to_string()),
            PlanError::InvalidDuration(_) | PlanError::TooManySegments { .. } => {
                Self::probe_failed(error.to_string())
            }
        }
    }
}

impl From<OrchestrationError> for PipelineError {
    fn from(error: OrchestrationError) -> Self {
        match error {
            OrchestrationError::Cancelled { .. } => Self::Cancelled,
        }
    }
}
