//! Duration codec: the fixed textual encoding used by the snapshot document,
//! plus the human-readable summary formatter used in command output.
//!
//! The encoding is four colon-separated integers, most significant first:
//! `days:hours:minutes:seconds`, with hours/minutes/seconds zero-padded to
//! two digits (`3:07:02:45`). It round-trips exactly for any non-negative
//! whole-second duration.

use chrono::Duration;
use thiserror::Error;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// Errors from [`decode`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    /// The text did not have exactly four colon-separated fields.
    #[error("expected days:hours:minutes:seconds, got {value:?}")]
    WrongShape { value: String },

    /// A field was not a non-negative integer.
    #[error("invalid {field} in duration {value:?}")]
    BadField { field: &'static str, value: String },

    /// Minutes or seconds were outside 0–59.
    #[error("{field} out of range in duration {value:?}")]
    OutOfRange { field: &'static str, value: String },

    /// The total exceeds the representable duration range.
    #[error("duration too large: {value:?}")]
    TooLarge { value: String },
}

/// Encodes a duration as `days:hours:minutes:seconds`.
///
/// Sub-second precision is truncated. Negative durations clamp to zero;
/// accumulated sums are never negative, so this only matters for callers
/// feeding in raw clock arithmetic.
#[must_use]
pub fn encode(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;
    format!("{days}:{hours:02}:{minutes:02}:{seconds:02}")
}

/// Decodes `days:hours:minutes:seconds` back into a duration.
///
/// Hours beyond 23 are accepted (lenient toward hand-edited snapshots);
/// minutes and seconds must be 0–59.
pub fn decode(text: &str) -> Result<Duration, DurationParseError> {
    let fields: Vec<&str> = text.split(':').collect();
    let [days, hours, minutes, seconds] = fields[..] else {
        return Err(DurationParseError::WrongShape {
            value: text.to_string(),
        });
    };

    let parse = |field: &'static str, s: &str| -> Result<i64, DurationParseError> {
        s.parse::<i64>()
            .ok()
            .filter(|&n| n >= 0)
            .ok_or(DurationParseError::BadField {
                field,
                value: text.to_string(),
            })
    };

    let days = parse("days", days)?;
    let hours = parse("hours", hours)?;
    let minutes = parse("minutes", minutes)?;
    let seconds = parse("seconds", seconds)?;

    if minutes > 59 {
        return Err(DurationParseError::OutOfRange {
            field: "minutes",
            value: text.to_string(),
        });
    }
    if seconds > 59 {
        return Err(DurationParseError::OutOfRange {
            field: "seconds",
            value: text.to_string(),
        });
    }

    // Checked arithmetic: a snapshot hand-edited (or corrupted) to a huge day
    // or hour count must come back as an error, not an overflow panic.
    let too_large = || DurationParseError::TooLarge {
        value: text.to_string(),
    };
    let total = days
        .checked_mul(SECS_PER_DAY)
        .zip(hours.checked_mul(SECS_PER_HOUR))
        .and_then(|(d, h)| d.checked_add(h))
        .and_then(|t| t.checked_add(minutes * SECS_PER_MINUTE + seconds))
        .ok_or_else(too_large)?;
    Duration::try_seconds(total).ok_or_else(too_large)
}

/// Renders a duration as a space-joined list of magnitude/unit pairs.
///
/// Zero day/hour/minute components are omitted; the seconds component is
/// always present, so a zero duration renders as `"0 Second(s)"`.
#[must_use]
pub fn humanize(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / SECS_PER_DAY;
    let hours = (total % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days} Day(s)"));
    }
    if hours > 0 {
        parts.push(format!("{hours} Hour(s)"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} Minute(s)"));
    }
    parts.push(format!("{seconds} Second(s)"));

    parts.join(" ")
}
