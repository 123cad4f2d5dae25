//! Gap and segment detection over an ordered clip sequence

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::model::{seconds_between, ClipGroup, DEFAULT_GAP_THRESHOLD_SECS};

/// Missing footage between two consecutive clip groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gap {
    /// End of the clip before the gap
    pub start: NaiveDateTime,
    /// Start of the clip after the gap
    pub end: NaiveDateTime,
    /// Real seconds without footage
    pub duration: f64,
    pub before_index: usize,
    pub after_index: usize,
}

/// Maximal run of clip groups with no gap between neighbours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub start_index: usize,
    /// Inclusive
    pub end_index: usize,
    /// Sum of member clip durations
    pub duration: f64,
}

impl Segment {
    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }

    pub fn clip_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// Segments and gaps found in one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub segments: Vec<Segment>,
    pub gaps: Vec<Gap>,
}

/// Splits clip sequences wherever the real-time distance exceeds a threshold
#[derive(Debug, Clone, Copy)]
pub struct GapDetector {
    threshold: f64,
}

impl Default for GapDetector {
    fn default() -> Self {
        Self::new(DEFAULT_GAP_THRESHOLD_SECS)
    }
}

impl GapDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Detect gaps and segments.
    ///
    /// `groups` is sorted by timestamp in place when the caller handed it over
    /// out of order; the returned indices refer to the sorted order.
    pub fn detect(&self, groups: &mut [ClipGroup]) -> Detection {
        if !groups.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()) {
            warn!("Clip groups arrived out of order, sorting before detection");
            groups.sort_by_key(|g| g.timestamp());
        }

        let mut detection = Detection::default();
        let Some(first) = groups.first() else {
            return detection;
        };

        let mut segment_start = 0;
        let mut segment_duration = first.duration();

        for (i, pair) in groups.windows(2).enumerate() {
            let (before, after) = (&pair[0], &pair[1]);
            let real_gap =
                seconds_between(before.timestamp(), after.timestamp()) - before.duration();

            if real_gap > self.threshold {
                debug!(before = i, after = i + 1, seconds = real_gap, "Gap detected");
                detection.segments.push(Segment {
                    start_index: segment_start,
                    end_index: i,
                    duration: segment_duration,
                });
                detection.gaps.push(Gap {
                    start: before.end_time(),
                    end: after.timestamp(),
                    duration: real_gap,
                    before_index: i,
                    after_index: i + 1,
                });
                segment_start = i + 1;
                segment_duration = 0.0;
            }
            segment_duration += after.duration();
        }

        detection.segments.push(Segment {
            start_index: segment_start,
            end_index: groups.len() - 1,
            duration: segment_duration,
        });

        detection
    }
}
