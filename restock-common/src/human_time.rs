//! Human-readable duration formatting
//!
//! Import runs range from sub-second (tiny files) to hours (large catalogs
//! with image syncing), so the completion summary picks a display format by
//! magnitude instead of always printing raw seconds.

/// Duration display format selection thresholds (seconds)
const SHORT_FORMAT_MAX: i64 = 100; // < 100s  -> X.XXs
const MEDIUM_FORMAT_MAX: i64 = 6000; // < 100m  -> M:SS
                                     // >= 100m -> H:MM:SS

/// Format a duration in seconds as display text.
///
/// - Short format (`X.XXs`): under 100 seconds
/// - Medium format (`M:SS`): under 100 minutes
/// - Long format (`H:MM:SS`): 100 minutes and above
///
/// # Examples
///
/// ```
/// use restock_common::human_time::format_duration;
///
/// assert_eq!(format_duration(45), "45.00s");
/// assert_eq!(format_duration(330), "5:30");
/// assert_eq!(format_duration(7261), "2:01:01");
/// ```
pub fn format_duration(seconds: i64) -> String {
    let secs = seconds.max(0);

    if secs < SHORT_FORMAT_MAX {
        format!("{:.2}s", secs as f64)
    } else if secs < MEDIUM_FORMAT_MAX {
        let minutes = secs / 60;
        let rem = secs % 60;
        format!("{}:{:02}", minutes, rem)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let rem = secs % 60;
        format!("{}:{:02}:{:02}", hours, mins, rem)
    }
}
