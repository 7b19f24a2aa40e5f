use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::audio::{FfmpegToolkit, MediaToolkit, SegmentExtractor};
use crate::config::Config;
use crate::download::{extract_video_id, AudioDownloader, YtDlpDownloader};
use crate::error::PipelineError;
use crate::planner::plan;
use crate::transcription::orchestrator::{orchestrate, SegmentFailure, TranscriptionOutcome};
use crate::transcription::srt::SubtitleTrack;
use crate::transcription::whisper::{SpeechToText, WhisperApiClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Idle,
    Downloading,
    Planning,
    Extracting,
    Transcribing,
    Done,
    Failed,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Downloading => "downloading",
            Self::Planning => "planning",
            Self::Extracting => "extracting",
            Self::Transcribing => "transcribing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of one successful run
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptReport {
    pub video_id: String,
    pub full_text: String,
    /// Merged track in SubRip format
    pub timed_text: String,
    pub segment_count: usize,
    pub cue_count: usize,
    pub failed_segments: Vec<SegmentFailure>,
    pub skipped_segments: Vec<usize>,
    /// Duration of the source audio
    pub duration_seconds: f64,
    pub generated_at: DateTime<Utc>,
    #[serde(skip)]
    pub track: SubtitleTrack,
}

impl TranscriptReport {
    fn new(video_id: String, outcome: TranscriptionOutcome, segment_count: usize, duration_seconds: f64) -> Self {
        Self {
            video_id,
            timed_text: outcome.track.serialize(),
            cue_count: outcome.track.len(),
            full_text: outcome.full_text,
            segment_count,
            failed_segments: outcome.failed_segments,
            skipped_segments: outcome.skipped_segments,
            duration_seconds,
            generated_at: Utc::now(),
            track: outcome.track,
        }
    }

    /// Every segment contributed to the transcript
    pub fn is_complete(&self) -> bool {
        self.failed_segments.is_empty() && self.skipped_segments.is_empty()
    }

    /// Write `transcript.txt` and `transcript.srt` into `dir`
    pub async fn save_to_dir(&self, dir: &Path) -> Result<(PathBuf, PathBuf)> {
        tokio::fs::create_dir_all(dir).await?;

        let text_path = dir.join("transcript.txt");
        tokio::fs::write(&text_path, &self.full_text).await?;

        let srt_path = dir.join("transcript.srt");
        tokio::fs::write(&srt_path, &self.timed_text).await?;

        info!("💾 Transcript saved to {}", dir.display());
        Ok((text_path, srt_path))
    }
}

/// Turns a video URL into a merged transcript.
///
/// Every run works inside its own temporary directory, which is removed when
/// the run ends no matter how it ends.
pub struct Pipeline {
    config: Config,
    downloader: Arc<dyn AudioDownloader>,
    toolkit: Arc<dyn MediaToolkit>,
    transcriber: Arc<dyn SpeechToText>,
    stage: watch::Sender<PipelineStage>,
}

impl Pipeline {
    /// Production pipeline: yt-dlp, ffmpeg and the Whisper API
    pub fn from_config(config: Config) -> Result<Self> {
        let downloader = Arc::new(YtDlpDownloader::new(&config.download));
        let toolkit = Arc::new(FfmpegToolkit::from_config(&config.audio));
        let transcriber = Arc::new(WhisperApiClient::new(&config.transcription)?);
        Ok(Self::with_components(config, downloader, toolkit, transcriber))
    }

    pub fn with_components(
        config: Config,
        downloader: Arc<dyn AudioDownloader>,
        toolkit: Arc<dyn MediaToolkit>,
        transcriber: Arc<dyn SpeechToText>,
    ) -> Self {
        let (stage, _) = watch::channel(PipelineStage::Idle);
        Self {
            config,
            downloader,
            toolkit,
            transcriber,
            stage,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stage(&self) -> PipelineStage {
        *self.stage.borrow()
    }

    pub async fn transcribe(&self, video_url: &str) -> Result<TranscriptReport, PipelineError> {
        self.transcribe_with_cancel(video_url, &CancellationToken::new()).await
    }

    /// Run the pipeline, checking `cancel` between stages and between segments
    pub async fn transcribe_with_cancel(
        &self,
        video_url: &str,
        cancel: &CancellationToken,
    ) -> Result<TranscriptReport, PipelineError> {
        let started = Instant::now();
        self.transition(PipelineStage::Idle);

        let result = self.run(video_url, cancel).await;

        match &result {
            Ok(report) => {
                self.transition(PipelineStage::Done);
                info!(
                    "🎉 {} transcribed in {:.1}s: {} cues from {} segments",
                    report.video_id,
                    started.elapsed().as_secs_f64(),
                    report.cue_count,
                    report.segment_count
                );
            }
            Err(e) => {
                self.transition(PipelineStage::Failed);
                error!("❌ Pipeline failed for {}: {}", video_url, e);
            }
        }

        result
    }

    async fn run(&self, video_url: &str, cancel: &CancellationToken) -> Result<TranscriptReport, PipelineError> {
        let video_id = extract_video_id(video_url)
            .map_err(|_| PipelineError::InvalidUrl(video_url.to_string()))?;

        if self.config.audio.chunk_length_seconds == 0 {
            return Err(PipelineError::InvalidConfig(
                "audio.chunk_length_seconds must be greater than 0".to_string(),
            ));
        }

        let workspace = self.create_workspace()?;
        info!("📁 Work directory: {}", workspace.path().display());

        let result = self.run_in(&video_id, video_url, workspace.path(), cancel).await;

        let path = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            warn!("Failed to remove work directory {}: {}", path.display(), e);
        }

        result
    }

    async fn run_in(
        &self,
        video_id: &str,
        video_url: &str,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<TranscriptReport, PipelineError> {
        check_cancelled(cancel)?;
        self.transition(PipelineStage::Downloading);
        let source = self
            .downloader
            .download_audio(video_url, work_dir)
            .await
            .map_err(|e| PipelineError::download_failed(&e))?;

        check_cancelled(cancel)?;
        self.transition(PipelineStage::Planning);
        let duration = self
            .toolkit
            .probe_duration(&source)
            .await
            .map_err(|e| PipelineError::probe_failed(e.to_string()))?;
        let boundaries = plan(duration, self.config.audio.chunk_length_seconds)?;
        info!(
            "📐 {:.1}s of audio planned into {} segments of up to {}s",
            duration,
            boundaries.len(),
            self.config.audio.chunk_length_seconds
        );

        check_cancelled(cancel)?;
        self.transition(PipelineStage::Extracting);
        let extractor = SegmentExtractor::new(Arc::clone(&self.toolkit), work_dir, &self.config.audio);
        let prepared = extractor.extract_all(&source, &boundaries).await;

        check_cancelled(cancel)?;
        self.transition(PipelineStage::Transcribing);
        let outcome = orchestrate(&prepared, self.transcriber.as_ref(), cancel).await?;

        if outcome.is_empty() {
            if self.config.transcription.fail_on_empty_transcript {
                return Err(PipelineError::NothingTranscribed {
                    failed: outcome.failed_segments.len(),
                    skipped: outcome.skipped_segments.len(),
                });
            }
            warn!("⚠️ No segment produced any subtitle; returning an empty transcript");
        }

        Ok(TranscriptReport::new(
            video_id.to_string(),
            outcome,
            boundaries.len(),
            duration,
        ))
    }

    fn create_workspace(&self) -> Result<TempDir, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("lingotube-");

        match &self.config.output.work_dir {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(PipelineError::Workspace)?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(PipelineError::Workspace)
    }

    fn transition(&self, stage: PipelineStage) {
        let previous = self.stage.send_replace(stage);
        if previous != stage {
            info!("🔄 Pipeline stage: {} -> {}", previous, stage);
        }
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}
