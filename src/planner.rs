//! Splits a total audio duration into contiguous, bounded segment windows.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    #[error("Invalid audio duration: {0} seconds")]
    InvalidDuration(f64),

    #[error("Chunk length must be greater than zero")]
    InvalidChunkLength,

    #[error("{total_seconds} seconds in {chunk_seconds}s chunks exceeds {max} segments")]
    TooManySegments {
        total_seconds: f64,
        chunk_seconds: u32,
        max: usize,
    },
}

/// Upper bound on segments per run; a larger plan means a bogus duration
pub const MAX_SEGMENTS: usize = 10_000;

/// `[start_seconds, end_seconds)` window assigned to one segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentBoundary {
    pub index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl SegmentBoundary {
    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Segment start in whole milliseconds, used to shift segment-local cue times
    pub fn start_offset_ms(&self) -> u64 {
        (self.start_seconds * 1000.0).round() as u64
    }
}

/// Plan `ceil(total / chunk)` boundaries; the last one is clipped to `total`.
pub fn plan(
    total_duration_seconds: f64,
    chunk_length_seconds: u32,
) -> Result<Vec<SegmentBoundary>, PlanError> {
    if !total_duration_seconds.is_finite() || total_duration_seconds <= 0.0 {
        return Err(PlanError::InvalidDuration(total_duration_seconds));
    }
    if chunk_length_seconds == 0 {
        return Err(PlanError::InvalidChunkLength);
    }

    let chunk = f64::from(chunk_length_seconds);
    let count = (total_duration_seconds / chunk).ceil();
    if count > MAX_SEGMENTS as f64 {
        return Err(PlanError::TooManySegments {
            total_seconds: total_duration_seconds,
            chunk_seconds: chunk_length_seconds,
            max: MAX_SEGMENTS,
        });
    }
    let count = count as usize;

    let boundaries = (0..count)
        .map(|index| {
            let start_seconds = index as f64 * chunk;
            let end_seconds = ((index + 1) as f64 * chunk).min(total_duration_seconds);
            SegmentBoundary {
                index,
                start_seconds,
                end_seconds,
            }
        })
        .collect();

    Ok(boundaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(boundaries: &[SegmentBoundary]) -> Vec<(f64, f64)> {
        boundaries
            .iter()
            .map(|b| (b.start_seconds, b.end_seconds))
            .collect()
    }

    #[test]
    fn test_plan_clips_last_segment() {
        let boundaries = plan(1500.0, 600).unwrap();

        assert_eq!(
            windows(&boundaries),
            vec![(0.0, 600.0), (600.0, 1200.0), (1200.0, 1500.0)]
        );
        assert_eq!(boundaries[2].duration_seconds(), 300.0);
        let indices: Vec<usize> = boundaries.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_plan_short_audio_yields_single_segment() {
        assert_eq!(windows(&plan(42.5, 600).unwrap()), vec![(0.0, 42.5)]);
        assert_eq!(windows(&plan(600.0, 600).unwrap()), vec![(0.0, 600.0)]);
    }

    #[test]
    fn test_plan_exact_multiple() {
        assert_eq!(
            windows(&plan(1200.0, 600).unwrap()),
            vec![(0.0, 600.0), (600.0, 1200.0)]
        );
    }

    #[test]
    fn test_plan_rejects_invalid_input() {
        assert_eq!(plan(0.0, 600), Err(PlanError::InvalidDuration(0.0)));
        assert_eq!(plan(-3.0, 600), Err(PlanError::InvalidDuration(-3.0)));
        assert!(matches!(
            plan(f64::NAN, 600),
            Err(PlanError::InvalidDuration(_))
        ));
        assert!(matches!(
            plan(f64::INFINITY, 600),
            Err(PlanError::InvalidDuration(_))
        ));
        assert_eq!(plan(10.0, 0), Err(PlanError::InvalidChunkLength));
    }

    #[test]
    fn test_plan_covers_duration_exactly_once() {
        let durations = [0.001, 0.5, 1.0, 59.9, 60.0, 61.0, 599.999, 1500.0, 3601.25, 7200.0];
        let chunks = [1u32, 7, 60, 600, 1000];

        for &total in &durations {
            for &chunk in &chunks {
                let boundaries = plan(total, chunk).unwrap();

                assert_eq!(
                    boundaries.len(),
                    (total / f64::from(chunk)).ceil() as usize,
                    "count for total={} chunk={}",
                    total,
                    chunk
                );
                assert_eq!(boundaries[0].start_seconds, 0.0);
                assert_eq!(boundaries.last().unwrap().end_seconds, total);

                for pair in boundaries.windows(2) {
                    assert_eq!(pair[0].end_seconds, pair[1].start_seconds);
                }
                for boundary in &boundaries {
                    assert!(boundary.end_seconds > boundary.start_seconds);
                }
            }
        }
    }

    #[test]
    fn test_plan_rejects_implausible_durations() {
        assert!(matches!(
            plan(1.0e12, 1),
            Err(PlanError::TooManySegments { max: MAX_SEGMENTS, .. })
        ));
        assert!(plan(MAX_SEGMENTS as f64 + 0.5, 1).is_err());
        assert_eq!(plan(MAX_SEGMENTS as f64, 1).unwrap().len(), MAX_SEGMENTS);
    }

    #[test]
    fn test_start_offset_ms() {
        let boundaries = plan(1500.0, 600).unwrap();
        assert_eq!(boundaries[1].start_offset_ms(), 600_000);
        assert_eq!(boundaries[2].start_offset_ms(), 1_200_000);
    }
}
