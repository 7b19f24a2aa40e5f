/// lingotube - English listening material from long YouTube videos
///
/// Downloads a video's audio, cuts it into bounded segments, transcribes each
/// segment and merges the results into one continuous transcript and subtitle
/// track. Optionally derives vocabulary lists and quizzes from the transcript.

pub mod audio;
pub mod config;
pub mod download;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod transcription;

// Re-export main types for easy access
pub use crate::audio::{FfmpegToolkit, MediaToolkit, PreparedSegment, SegmentExtractor, SegmentInput};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::download::{extract_video_id, AudioDownloader, YtDlpDownloader};
pub use crate::error::PipelineError;
pub use crate::llm::study::{QuizItem, StudyMaterialGenerator, VocabularyList};
pub use crate::llm::{LLMConfig, LLMProvider};
pub use crate::pipeline::{Pipeline, PipelineStage, TranscriptReport};
pub use crate::planner::{plan, SegmentBoundary};
pub use crate::transcription::{
    SpeechToText, SubtitleCue, SubtitleTrack, TranscriptionOutcome, WhisperApiClient,
};
