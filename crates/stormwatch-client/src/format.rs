//! Presentation helpers for the strike list.

use chrono::{DateTime, Utc};

/// Number of bars in an intensity meter.
pub const INTENSITY_BAR_COUNT: usize = 10;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 3_600;
const SECS_PER_DAY: i64 = 86_400;

/// Elapsed time since `timestamp` as a clock-style string.
///
/// Under a day this is `HH:MM:SS`; older strikes show their date, e.g.
/// `"Oct 16, 03:04 PM"` (UTC). Timestamps in the future read as
/// `00:00:00`.
pub fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0);

    if elapsed >= SECS_PER_DAY {
        return timestamp.format("%b %-d, %I:%M %p").to_string();
    }

    let hours = elapsed / SECS_PER_HOUR;
    let minutes = (elapsed % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = elapsed % SECS_PER_MINUTE;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Which bars of the ten-bar meter are lit for `intensity`.
pub fn intensity_bars(intensity: u8) -> [bool; INTENSITY_BAR_COUNT] {
    let mut bars = [false; INTENSITY_BAR_COUNT];
    for bar in bars.iter_mut().take(usize::from(intensity)) {
        *bar = true;
    }
    bars
}
