//! Conversion between `HH:MM:SS,mmm` timestamps and absolute milliseconds.

use thiserror::Error;

const MILLIS_PER_SECOND: u64 = 1_000;
const MILLIS_PER_MINUTE: u64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MINUTE;

/// Separator between the start and end timestamp of a cue
pub const RANGE_ARROW: &str = "-->";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Malformed timestamp: {0:?}")]
    Malformed(String),

    #[error("Malformed time range: {0:?}")]
    MalformedRange(String),
}

/// Parse a `HH:MM:SS,mmm` timestamp into milliseconds.
///
/// Hours take two or more digits, minutes and seconds exactly two digits
/// below 60, and milliseconds exactly three digits.
pub fn parse_timestamp(timestamp: &str) -> Result<u64, TimestampError> {
    let malformed = || TimestampError::Malformed(timestamp.to_string());
    let trimmed = timestamp.trim();

    let (clock, millis) = trimmed.split_once(',').ok_or_else(malformed)?;
    let hms_parts: Vec<&str> = clock.split(':').collect();
    if hms_parts.len() != 3 {
        return Err(malformed());
    }

    let hours = parse_digits(hms_parts[0], 2, None).ok_or_else(malformed)?;
    let minutes = parse_digits(hms_parts[1], 2, Some(2)).ok_or_else(malformed)?;
    let seconds = parse_digits(hms_parts[2], 2, Some(2)).ok_or_else(malformed)?;
    let milliseconds = parse_digits(millis, 3, Some(3)).ok_or_else(malformed)?;

    if minutes >= 60 || seconds >= 60 {
        return Err(malformed());
    }

    hours
        .checked_mul(MILLIS_PER_HOUR)
        .and_then(|total| total.checked_add(minutes * MILLIS_PER_MINUTE))
        .and_then(|total| total.checked_add(seconds * MILLIS_PER_SECOND + milliseconds))
        .ok_or_else(malformed)
}

/// Format milliseconds as `HH:MM:SS,mmm`. Hours are not capped.
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / MILLIS_PER_HOUR;
    let minutes = (ms % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let seconds = (ms % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    let milliseconds = ms % MILLIS_PER_SECOND;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, milliseconds)
}

/// Parse the `start --> end` line of a timed-text block
pub fn parse_time_range(line: &str) -> Result<(u64, u64), TimestampError> {
    let (start, end) = line
        .split_once(RANGE_ARROW)
        .ok_or_else(|| TimestampError::MalformedRange(line.to_string()))?;

    // Some producers append positioning hints after the end timestamp
    let end = end.split_whitespace().next().unwrap_or_default();

    Ok((parse_timestamp(start)?, parse_timestamp(end)?))
}

/// Format a `start --> end` line
pub fn format_time_range(start_ms: u64, end_ms: u64) -> String {
    format!(
        "{} {} {}",
        format_timestamp(start_ms),
        RANGE_ARROW,
        format_timestamp(end_ms)
    )
}

fn parse_digits(field: &str, min_len: usize, max_len: Option<usize>) -> Option<u64> {
    let len_ok = field.len() >= min_len && max_len.map_or(true, |max| field.len() <= max);
    if !len_ok || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
