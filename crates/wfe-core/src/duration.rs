//! Human-readable duration parsing and formatting (spec §4.1).
//!
//! Recognized shapes: `<int><unit>` where unit is one of `ms`, `s`/`sec`,
//! `m`/`min`, `h`, `d`. Whitespace around the number and unit is
//! tolerated. A bare integer is interpreted as milliseconds.

use std::time::Duration;

use crate::error::WfeError;

/// Parse a duration string such as `"50ms"`, `"3h"`, or `"  10 min"`.
///
/// A string containing only digits (no unit) is interpreted as a raw
/// millisecond count, matching the "Configs accepting durations also
/// accept a raw integer interpreted as milliseconds" rule.
pub fn parse_duration(input: &str) -> Result<Duration, WfeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(WfeError::Config("empty duration string".to_string()));
    }

    let split_at = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split_at);
    let unit = unit.trim();

    let amount: u64 = number
        .parse()
        .map_err(|_| WfeError::Config(format!("invalid duration '{input}': no leading integer")))?;

    let millis = match unit {
        "" | "ms" => amount,
        "s" | "sec" => amount.saturating_mul(1_000),
        "m" | "min" => amount.saturating_mul(60_000),
        "h" => amount.saturating_mul(3_600_000),
        "d" => amount.saturating_mul(86_400_000),
        other => {
            return Err(WfeError::Config(format!(
                "invalid duration '{input}': unrecognized unit '{other}'"
            )));
        }
    };

    Ok(Duration::from_millis(millis))
}

/// Format a [`Duration`] back into the largest whole unit that divides
/// it evenly, falling back to milliseconds. This is the inverse used by
/// the round-trip property in spec §8 — it is not meant to be a general
/// pretty-printer, only to recover the same millisecond count on reparse.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis() as u64;
    if millis == 0 {
        return "0ms".to_string();
    }
    if millis % 86_400_000 == 0 {
        format!("{}d", millis / 86_400_000)
    } else if millis % 3_600_000 == 0 {
        format!("{}h", millis / 3_600_000)
    } else if millis % 60_000 == 0 {
        format!("{}min", millis / 60_000)
    } else if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{millis}ms")
    }
}

/// Format a [`Duration`] as `HH:MM:SS`, zero-padded, for SGE's `h_rt`
/// resource request (spec §4.4).
pub fn format_hms(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
