//! Human-readable track duration formatting
//!
//! Provides consistent duration display across the queue listing, the
//! status report and log lines.

/// Durations at or above this many seconds include an hours field
const HOURS_FORMAT_MIN: u64 = 3600;

/// Format a duration in milliseconds as `M:SS` (or `H:MM:SS` for an hour or more)
///
/// Sub-second remainders are truncated, matching how players display
/// track lengths.
///
/// # Examples
///
/// ```
/// use jukebox_common::human_time::format_duration_ms;
///
/// assert_eq!(format_duration_ms(354_000), "5:54");
/// assert_eq!(format_duration_ms(59_999), "0:59");
/// assert_eq!(format_duration_ms(3_723_000), "1:02:03");
/// ```
pub fn format_duration_ms(duration_ms: u64) -> String {
    let total_secs = duration_ms / 1000;

    if total_secs >= HOURS_FORMAT_MIN {
        let hours = total_secs / 3600;
        let mins = (total_secs % 3600) / 60;
        let secs = total_secs % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}:{:02}", mins, secs)
    }
}
