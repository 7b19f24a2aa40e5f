//! Sequential transcription of prepared segments into one global track.
//!
//! Each segment's cues are shifted by the segment's start offset and
//! renumbered from a running counter, so the merged track is numbered
//! `1..=N` without gaps and cues from different segments never overlap.
//! A segment that fails only removes its own contribution.

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::srt::{extract_plain_text, SubtitleCue, SubtitleTrack};
use super::whisper::SpeechToText;
use crate::audio::{PreparedSegment, SegmentInput};
use crate::planner::SegmentBoundary;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("transcription cancelled after {completed_segments} segments")]
    Cancelled { completed_segments: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureStage {
    Extraction,
    Transcription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentFailure {
    pub index: usize,
    pub stage: FailureStage,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranscriptionOutcome {
    pub full_text: String,
    pub track: SubtitleTrack,
    pub failed_segments: Vec<SegmentFailure>,
    pub skipped_segments: Vec<usize>,
}

impl TranscriptionOutcome {
    /// No segment contributed any cue
    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }
}

/// What happened to one segment before it is merged
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentResult {
    Transcribed {
        boundary: SegmentBoundary,
        raw_timed_text: String,
    },
    Skipped {
        boundary: SegmentBoundary,
    },
    Failed {
        boundary: SegmentBoundary,
        stage: FailureStage,
        reason: String,
    },
}

/// Running state of the merge
#[derive(Debug, Clone, PartialEq)]
pub struct TrackAccumulator {
    next_sequence_number: u32,
    cues: Vec<SubtitleCue>,
    text_parts: Vec<String>,
    failed_segments: Vec<SegmentFailure>,
    skipped_segments: Vec<usize>,
}

impl Default for TrackAccumulator {
    fn default() -> Self {
        Self {
            next_sequence_number: 1,
            cues: Vec::new(),
            text_parts: Vec::new(),
            failed_segments: Vec::new(),
            skipped_segments: Vec::new(),
        }
    }
}

impl TrackAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> TranscriptionOutcome {
        TranscriptionOutcome {
            full_text: self.text_parts.join(" "),
            track: SubtitleTrack::from(self.cues),
            failed_segments: self.failed_segments,
            skipped_segments: self.skipped_segments,
        }
    }

    fn record_failure(&mut self, index: usize, stage: FailureStage, reason: String) {
        warn!("⚠️ Segment {} failed during {:?}: {}", index, stage, reason);
        self.failed_segments.push(SegmentFailure { index, stage, reason });
    }
}

/// Merge one segment's result into the accumulator
pub fn fold_segment(mut acc: TrackAccumulator, result: SegmentResult) -> TrackAccumulator {
    match result {
        SegmentResult::Skipped { boundary } => {
            acc.skipped_segments.push(boundary.index);
        }
        SegmentResult::Failed {
            boundary,
            stage,
            reason,
        } => {
            acc.record_failure(boundary.index, stage, reason);
        }
        SegmentResult::Transcribed {
            boundary,
            raw_timed_text,
        } => {
            if raw_timed_text.trim().is_empty() {
                acc.record_failure(
                    boundary.index,
                    FailureStage::Transcription,
                    "empty transcription response".to_string(),
                );
                return acc;
            }

            let local = SubtitleTrack::parse(&raw_timed_text);
            if local.is_empty() {
                acc.record_failure(
                    boundary.index,
                    FailureStage::Transcription,
                    "response contained no parsable subtitle blocks".to_string(),
                );
                return acc;
            }

            let offset_ms = boundary.start_offset_ms();
            for cue in local.iter() {
                acc.cues
                    .push(cue.shifted_and_renumbered(offset_ms, acc.next_sequence_number));
                acc.next_sequence_number += 1;
            }

            let text = extract_plain_text(&raw_timed_text);
            if !text.is_empty() {
                acc.text_parts.push(text);
            }
        }
    }
    acc
}

/// Transcribe prepared segments in order and merge them into one outcome
pub async fn orchestrate(
    segments: &[PreparedSegment],
    transcriber: &dyn SpeechToText,
    cancel: &CancellationToken,
) -> Result<TranscriptionOutcome, OrchestrationError> {
    let mut acc = TrackAccumulator::new();

    for (completed, segment) in segments.iter().enumerate() {
        if cancel.is_cancelled() {
            info!("🛑 Cancelled before segment {}", segment.boundary.index);
            return Err(OrchestrationError::Cancelled {
                completed_segments: completed,
            });
        }

        let boundary = segment.boundary;
        let result = match &segment.input {
            SegmentInput::Skipped { reason } => {
                info!("⏭️ Segment {} skipped: {}", boundary.index, reason);
                SegmentResult::Skipped { boundary }
            }
            SegmentInput::Failed { reason } => SegmentResult::Failed {
                boundary,
                stage: FailureStage::Extraction,
                reason: reason.clone(),
            },
            SegmentInput::Ready(file) => {
                info!(
                    "🎙️ Transcribing segment {} ({:.1}s - {:.1}s)",
                    boundary.index, boundary.start_seconds, boundary.end_seconds
                );
                match transcriber.transcribe_timed_text(&file.path).await {
                    Ok(raw_timed_text) => SegmentResult::Transcribed {
                        boundary,
                        raw_timed_text,
                    },
                    Err(e) => SegmentResult::Failed {
                        boundary,
                        stage: FailureStage::Transcription,
                        reason: e.to_string(),
                    },
                }
            }
        };

        acc = fold_segment(acc, result);
    }

    let outcome = acc.finish();
    info!(
        "✅ Transcription merged: {} cues, {} failed, {} skipped",
        outcome.track.len(),
        outcome.failed_segments.len(),
        outcome.skipped_segments.len()
    );
    Ok(outcome)
}
