use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

use super::timecode::{format_time_range, parse_time_range};

/// One subtitle cue (SubRip block)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCue {
    /// Sequence number, unique and strictly increasing within a track
    pub sequence_number: u32,
    /// Start time in milliseconds
    pub start_ms: u64,
    /// End time in milliseconds
    pub end_ms: u64,
    /// Text lines in display order
    pub text: Vec<String>,
}

impl SubtitleCue {
    /// Create a new cue
    pub fn new(sequence_number: u32, start_ms: u64, end_ms: u64, text: Vec<String>) -> Self {
        Self {
            sequence_number,
            start_ms,
            end_ms,
            text,
        }
    }

    /// Copy of this cue moved by `offset_ms` and carrying a new sequence number
    pub fn shifted_and_renumbered(&self, offset_ms: u64, sequence_number: u32) -> Self {
        Self {
            sequence_number,
            start_ms: self.start_ms + offset_ms,
            end_ms: self.end_ms + offset_ms,
            text: self.text.clone(),
        }
    }

    /// Whether `ms` falls inside `[start_ms, end_ms)`
    pub fn contains(&self, ms: u64) -> bool {
        ms >= self.start_ms && ms < self.end_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    /// Text lines joined by single spaces
    pub fn plain_text(&self) -> String {
        self.text.join(" ")
    }
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.sequence_number)?;
        writeln!(f, "{}", format_time_range(self.start_ms, self.end_ms))?;
        for line in &self.text {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Ordered sequence of cues.
///
/// Order is whatever the producer pushed; the track never re-sorts itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    cues: Vec<SubtitleCue>,
}

impl SubtitleTrack {
    /// Create an empty track
    pub fn new() -> Self {
        Self { cues: Vec::new() }
    }

    /// Parse a raw timed-text blob.
    ///
    /// Blocks with fewer than three lines, a non-numeric sequence line, an
    /// unparsable arrow line or an empty time range are skipped.
    pub fn parse(raw: &str) -> Self {
        let cues = split_blocks(raw)
            .into_iter()
            .filter_map(|block| parse_block(&block))
            .collect();
        Self { cues }
    }

    /// Serialize to timed-text, every block followed by a blank line
    pub fn serialize(&self) -> String {
        let mut content = String::new();

        for cue in &self.cues {
            content.push_str(&cue.to_string());
            content.push('\n');
        }

        content
    }

    /// Save the serialized track to a file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        tokio::fs::write(path.as_ref(), self.serialize()).await?;
        Ok(())
    }

    /// Append a cue at the end of the track
    pub fn push(&mut self, cue: SubtitleCue) {
        self.cues.push(cue);
    }

    /// Cue being displayed at playback position `ms`, if any
    pub fn cue_at(&self, ms: u64) -> Option<&SubtitleCue> {
        self.cues.iter().find(|cue| cue.contains(ms))
    }

    /// End of the last cue
    pub fn total_duration_ms(&self) -> u64 {
        self.cues.iter().map(|cue| cue.end_ms).max().unwrap_or(0)
    }

    pub fn cues(&self) -> &[SubtitleCue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubtitleCue> {
        self.cues.iter()
    }

    pub fn into_cues(self) -> Vec<SubtitleCue> {
        self.cues
    }
}

impl From<Vec<SubtitleCue>> for SubtitleTrack {
    fn from(cues: Vec<SubtitleCue>) -> Self {
        Self { cues }
    }
}

impl<'a> IntoIterator for &'a SubtitleTrack {
    type Item = &'a SubtitleCue;
    type IntoIter = std::slice::Iter<'a, SubtitleCue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.iter()
    }
}

/// Text of every valid block in a raw timed-text blob, joined by single spaces
pub fn extract_plain_text(raw: &str) -> String {
    split_blocks(raw)
        .into_iter()
        .filter_map(|block| parse_block(&block))
        .map(|cue| cue.plain_text())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split on blank (empty or whitespace-only) lines
fn split_blocks(raw: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn parse_block(lines: &[&str]) -> Option<SubtitleCue> {
    if lines.len() < 3 {
        return None;
    }

    // Producers sometimes prepend a byte order mark to the first block
    let sequence_line = lines[0].trim().trim_start_matches('\u{feff}');
    let sequence_number = match sequence_line.parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => {
            debug!("Skipping block with invalid sequence line: {:?}", lines[0]);
            return None;
        }
    };

    let (start_ms, end_ms) = match parse_time_range(lines[1]) {
        Ok(range) => range,
        Err(e) => {
            debug!("Skipping block {}: {}", sequence_number, e);
            return None;
        }
    };

    if end_ms <= start_ms {
        debug!(
            "Skipping block {}: empty time range {}..{}",
            sequence_number, start_ms, end_ms
        );
        return None;
    }

    let text = lines[2..]
        .iter()
        .map(|line| line.trim_end().to_string())
        .collect();

    Some(SubtitleCue::new(sequence_number, start_ms, end_ms, text))
}
