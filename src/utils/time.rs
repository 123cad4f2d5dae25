//! Transcoder time marker parsing and duration formatting

use std::time::Duration;

/// Extract the `time=HH:MM:SS.hh` marker from a transcoder status line.
///
/// Returns `None` for lines without a marker and for markers that do not
/// parse (`time=N/A`, truncated writes); a garbled line is never an error.
pub fn parse_progress_time(line: &str) -> Option<f64> {
    let start = line.rfind("time=")? + "time=".len();
    let value = line[start..].split_whitespace().next()?;

    let negative = value.starts_with('-');
    let value = value.trim_start_matches('-');
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: u64 = parts[0].parse().ok()?;
    let minutes: u64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }

    // Muxers report a small negative time before the first frame
    if negative {
        return Some(0.0);
    }
    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Format a wall-clock duration for display
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let milliseconds = duration.subsec_millis();

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_marker() {
        let line = "frame=  240 fps= 48 q=28.0 size=    1024kB time=00:01:02.50 bitrate=1342.2kbits/s speed=1.9x";
        assert_eq!(parse_progress_time(line), Some(62.5));
        assert_eq!(parse_progress_time("time=01:00:00.00"), Some(3600.0));
    }

    #[test]
    fn test_progress_marker_tolerates_noise() {
        assert_eq!(parse_progress_time("Stream mapping:"), None);
        assert_eq!(parse_progress_time("size=0kB time=N/A bitrate=N/A"), None);
        assert_eq!(parse_progress_time("time=00:0"), None);
        assert_eq!(parse_progress_time("time=-00:00:00.04 bitrate=N/A"), Some(0.0));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(62_500)), "01:02.500");
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05.000");
    }
}
