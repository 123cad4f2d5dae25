//! Burned-in wall-clock timestamp

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::planner::FootageRun;

/// Distance between the text box and the frame edge, in pixels
const EDGE_MARGIN: u32 = 20;

/// Screen anchor for the timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampPosition {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    #[default]
    BottomCenter,
    BottomRight,
}

impl TimestampPosition {
    pub const ALL: [TimestampPosition; 6] = [
        TimestampPosition::TopLeft,
        TimestampPosition::TopCenter,
        TimestampPosition::TopRight,
        TimestampPosition::BottomLeft,
        TimestampPosition::BottomCenter,
        TimestampPosition::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampPosition::TopLeft => "top-left",
            TimestampPosition::TopCenter => "top-center",
            TimestampPosition::TopRight => "top-right",
            TimestampPosition::BottomLeft => "bottom-left",
            TimestampPosition::BottomCenter => "bottom-center",
            TimestampPosition::BottomRight => "bottom-right",
        }
    }

    /// drawtext `x` and `y` expressions
    fn coordinates(&self) -> (String, String) {
        let left = EDGE_MARGIN.to_string();
        let center = "(w-tw)/2".to_string();
        let right = format!("w-tw-{}", EDGE_MARGIN);
        let top = EDGE_MARGIN.to_string();
        let bottom = format!("h-th-{}", EDGE_MARGIN);

        match self {
            TimestampPosition::TopLeft => (left, top),
            TimestampPosition::TopCenter => (center, top),
            TimestampPosition::TopRight => (right, top),
            TimestampPosition::BottomLeft => (left, bottom),
            TimestampPosition::BottomCenter => (center, bottom),
            TimestampPosition::BottomRight => (right, bottom),
        }
    }
}

impl fmt::Display for TimestampPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimestampPosition {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        TimestampPosition::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                DomainError::BadArgs(format!(
                    "unknown timestamp position '{}', expected one of top-left, top-center, \
                     top-right, bottom-left, bottom-center, bottom-right",
                    s
                ))
            })
    }
}

/// Fixed text style
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub font_size: u32,
    pub font_file: Option<PathBuf>,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_size: 36,
            font_file: None,
        }
    }
}

/// Timestamp overlay driven by the output frame clock
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampOverlay {
    pub position: TimestampPosition,
    pub style: OverlayStyle,
}

impl TimestampOverlay {
    pub fn new(position: TimestampPosition) -> Self {
        Self {
            position,
            style: OverlayStyle::default(),
        }
    }

    pub fn with_font_file(mut self, font_file: Option<PathBuf>) -> Self {
        self.style.font_file = font_file;
        self
    }

    /// One drawtext filter per run. Each run's clock is seeded so that its
    /// first output frame shows the run's real start; with several runs each
    /// filter is only enabled inside its own window. Windows are half-open
    /// except the last, so a boundary frame shows exactly one clock.
    pub fn filters(&self, runs: &[FootageRun]) -> Vec<String> {
        let gated = runs.len() > 1;
        let last = runs.len().saturating_sub(1);
        runs.iter()
            .enumerate()
            .map(|(index, run)| {
                let enable = gated.then(|| {
                    let (from, to) = (run.output_start, run.output_start + run.duration);
                    if index == last {
                        format!("between(t,{:.3},{:.3})", from, to)
                    } else {
                        format!("gte(t,{:.3})*lt(t,{:.3})", from, to)
                    }
                });
                self.drawtext(run.real_start, run.output_start, enable)
            })
            .collect()
    }

    fn drawtext(&self, real_start: NaiveDateTime, output_start: f64, enable: Option<String>) -> String {
        // Wall-clock digits are local time; rendering them through gmtime
        // keeps them exactly as recorded.
        let epoch = Utc.from_utc_datetime(&real_start).timestamp_millis() as f64 / 1000.0 - output_start;
        let (x, y) = self.position.coordinates();

        let mut options = vec![
            format!("text='%{{pts\\:gmtime\\:{:.3}\\:%Y-%m-%d %T}}'", epoch),
            format!("fontsize={}", self.style.font_size),
            "fontcolor=white".to_string(),
            "box=1".to_string(),
            "boxcolor=black@0.5".to_string(),
            "boxborderw=8".to_string(),
            format!("x={}", x),
            format!("y={}", y),
        ];
        if let Some(font_file) = &self.style.font_file {
            options.push(format!("fontfile='{}'", escape_quoted(&font_file.to_string_lossy())));
        }
        if let Some(window) = enable {
            options.push(format!("enable='{}'", window));
        }

        format!("drawtext={}", options.join(":"))
    }
}

/// Escape a value for use inside single quotes in a filter graph
pub(crate) fn escape_quoted(value: &str) -> String {
    value.replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!(
            "bottom_right".parse::<TimestampPosition>().unwrap(),
            TimestampPosition::BottomRight
        );
        assert_eq!(
            "Top-Center".parse::<TimestampPosition>().unwrap(),
            TimestampPosition::TopCenter
        );
        assert!("middle".parse::<TimestampPosition>().is_err());
    }

    #[test]
    fn test_single_run_is_not_gated() {
        let overlay = TimestampOverlay::new(TimestampPosition::TopLeft);
        let runs = vec![FootageRun {
            output_start: 0.0,
            duration: 90.0,
            real_start: at(12, 0, 15),
        }];
        let filters = overlay.filters(&runs);
        assert_eq!(filters.len(), 1);
        // 2024-03-09T12:00:15Z
        assert!(filters[0].contains("gmtime\\:1709985615.000\\:"));
        assert!(filters[0].contains("x=20:y=20"));
        assert!(!filters[0].contains("enable="));
    }

    #[test]
    fn test_runs_reseed_clock() {
        let overlay = TimestampOverlay::new(TimestampPosition::BottomRight);
        let runs = vec![
            FootageRun {
                output_start: 0.0,
                duration: 120.0,
                real_start: at(12, 10, 0),
            },
            FootageRun {
                output_start: 120.0,
                duration: 30.0,
                real_start: at(12, 34, 59),
            },
        ];
        let filters = overlay.filters(&runs);
        assert_eq!(filters.len(), 2);
        // t=120 belongs to the second run only
        assert!(filters[0].contains("enable='gte(t,0.000)*lt(t,120.000)'"));
        assert!(filters[1].contains("enable='between(t,120.000,150.000)'"));
        // Seeded so that t=120 shows 12:34:59
        let seeded = Utc.from_utc_datetime(&at(12, 34, 59)).timestamp() - 120;
        assert!(filters[1].contains(&format!("gmtime\\:{}.000", seeded)));
        assert!(filters[1].contains("x=w-tw-20:y=h-th-20"));
    }

    #[test]
    fn test_boundary_frames_show_one_clock() {
        let overlay = TimestampOverlay::new(TimestampPosition::TopRight);
        let runs: Vec<FootageRun> = [(0.0, 60.0, 12), (60.0, 60.0, 13), (120.0, 15.0, 14)]
            .into_iter()
            .map(|(output_start, duration, hour)| FootageRun {
                output_start,
                duration,
                real_start: at(hour, 0, 0),
            })
            .collect();
        let filters = overlay.filters(&runs);
        assert_eq!(filters.len(), 3);
        assert!(filters[0].contains("enable='gte(t,0.000)*lt(t,60.000)'"));
        assert!(filters[1].contains("enable='gte(t,60.000)*lt(t,120.000)'"));
        assert!(filters[2].contains("enable='between(t,120.000,135.000)'"));
        assert!(filters.iter().all(|f| f.matches("between(").count() <= 1));
    }

    #[test]
    fn test_font_file_is_quoted() {
        let overlay = TimestampOverlay::new(TimestampPosition::BottomCenter)
            .with_font_file(Some(PathBuf::from("/fonts/it's.ttf")));
        let runs = vec![FootageRun {
            output_start: 0.0,
            duration: 1.0,
            real_start: at(0, 0, 0),
        }];
        assert!(overlay.filters(&runs)[0].contains("fontfile='/fonts/it'\\''s.ttf'"));
    }
}
