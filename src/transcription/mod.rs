pub mod orchestrator;
pub mod srt;
pub mod timecode;
pub mod whisper;

pub use orchestrator::{
    fold_segment, orchestrate, FailureStage, OrchestrationError, SegmentFailure, SegmentResult,
    TrackAccumulator, TranscriptionOutcome,
};
pub use srt::{extract_plain_text, SubtitleCue, SubtitleTrack};
pub use timecode::{format_timestamp, parse_time_range, parse_timestamp, TimestampError};
pub use whisper::{SpeechToText, TranscriptionError, WhisperApiClient};
