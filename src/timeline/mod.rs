//! Gap-aware footage timeline
//!
//! Footage time is the scrubber's coordinate system: the sum of clip durations
//! with every real-time gap removed. The timeline maps footage time to a
//! `(clip index, offset within clip)` pair and back, and knows where the gaps
//! sit in real time.
//!
//! A timeline is a value. Any change to the clip set or to a measured
//! duration builds a new one from scratch, since gap classification depends
//! on every neighbouring pair.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::domain::errors::DomainError;
use crate::domain::model::{offset_by_seconds, CameraId, ClipGroup};

pub mod detector;

pub use detector::{Detection, Gap, GapDetector, Segment};

/// A point inside the footage expressed as clip index plus in-clip offset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FootagePosition {
    pub clip_index: usize,
    /// Seconds from the start of the clip
    pub offset: f64,
}

impl FootagePosition {
    pub fn new(clip_index: usize, offset: f64) -> Self {
        Self { clip_index, offset }
    }
}

/// Ordered clip groups plus their derived segments, gaps and prefix sums
#[derive(Debug, Clone)]
pub struct FootageTimeline {
    groups: Vec<ClipGroup>,
    detection: Detection,
    /// `prefix[i]` is the footage time at which clip `i` starts; one extra
    /// trailing entry holds the total
    prefix: Vec<f64>,
    detector: GapDetector,
}

impl Default for FootageTimeline {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FootageTimeline {
    /// Build a timeline with the default gap threshold
    pub fn new(groups: Vec<ClipGroup>) -> Self {
        Self::with_detector(groups, GapDetector::default())
    }

    pub fn with_detector(mut groups: Vec<ClipGroup>, detector: GapDetector) -> Self {
        let detection = detector.detect(&mut groups);

        let mut prefix = Vec::with_capacity(groups.len() + 1);
        let mut total = 0.0;
        prefix.push(total);
        for group in &groups {
            total += group.duration();
            prefix.push(total);
        }

        info!(
            clips = groups.len(),
            segments = detection.segments.len(),
            gaps = detection.gaps.len(),
            footage_secs = total,
            "Footage timeline built"
        );

        Self {
            groups,
            detection,
            prefix,
            detector,
        }
    }

    pub fn groups(&self) -> &[ClipGroup] {
        &self.groups
    }

    pub fn group(&self, clip_index: usize) -> Option<&ClipGroup> {
        self.groups.get(clip_index)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.detection.segments
    }

    pub fn gaps(&self) -> &[Gap] {
        &self.detection.gaps
    }

    pub fn gap_threshold(&self) -> f64 {
        self.detector.threshold()
    }

    /// Sum of all clip durations; gaps never count
    pub fn total_duration(&self) -> f64 {
        self.prefix.last().copied().unwrap_or(0.0)
    }

    /// Footage time at which clip `clip_index` begins
    pub fn clip_start(&self, clip_index: usize) -> f64 {
        self.prefix
            .get(clip_index)
            .copied()
            .unwrap_or_else(|| self.total_duration())
    }

    /// Footage time of an in-clip offset. The offset is clamped to the clip.
    pub fn footage_position_of(&self, clip_index: usize, offset: f64) -> f64 {
        match self.groups.get(clip_index) {
            Some(group) => self.prefix[clip_index] + offset.clamp(0.0, group.duration()),
            None => self.total_duration(),
        }
    }

    /// Inverse of [`footage_position_of`](Self::footage_position_of).
    ///
    /// Times before zero resolve to the first clip's start and times past
    /// the end clamp to the last clip's end. `None` only for an empty timeline.
    pub fn resolve_footage_time(&self, footage_time: f64) -> Option<FootagePosition> {
        let last = self.groups.len().checked_sub(1)?;

        if footage_time.is_nan() || footage_time <= 0.0 {
            return Some(FootagePosition::new(0, 0.0));
        }
        if footage_time >= self.total_duration() {
            return Some(FootagePosition::new(last, self.groups[last].duration()));
        }

        // prefix[0] == 0.0 <= footage_time, so the partition point is at least 1
        let clip_index = (self.prefix.partition_point(|&start| start <= footage_time) - 1).min(last);
        let offset = (footage_time - self.prefix[clip_index])
            .clamp(0.0, self.groups[clip_index].duration());
        Some(FootagePosition::new(clip_index, offset))
    }

    /// Resolve a scrubber percentage (0-100)
    pub fn resolve_percent(&self, percent: f64) -> Option<FootagePosition> {
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        self.resolve_footage_time(percent / 100.0 * self.total_duration())
    }

    /// Scrubber percentage of a position
    pub fn percent_of(&self, position: FootagePosition) -> f64 {
        let total = self.total_duration();
        if total <= 0.0 {
            return 0.0;
        }
        (self.footage_position_of(position.clip_index, position.offset) / total * 100.0)
            .clamp(0.0, 100.0)
    }

    /// Wall-clock instant shown at a footage position
    pub fn real_time_at(&self, position: FootagePosition) -> Option<NaiveDateTime> {
        let group = self.groups.get(position.clip_index)?;
        Some(offset_by_seconds(
            group.timestamp(),
            position.offset.clamp(0.0, group.duration()),
        ))
    }

    /// Gap that starts right after clip `clip_index`, if any
    pub fn gap_after(&self, clip_index: usize) -> Option<&Gap> {
        self.detection
            .gaps
            .iter()
            .find(|gap| gap.before_index == clip_index)
    }

    /// Gaps lying between clips `first` and `last` (inclusive range of clips)
    pub fn gaps_within(&self, first: usize, last: usize) -> impl Iterator<Item = &Gap> {
        self.detection
            .gaps
            .iter()
            .filter(move |gap| gap.before_index >= first && gap.after_index <= last)
    }

    /// Segment containing clip `clip_index`
    pub fn segment_of(&self, clip_index: usize) -> Option<&Segment> {
        self.detection
            .segments
            .iter()
            .find(|segment| segment.contains(clip_index))
    }

    /// A rebuilt timeline with one camera file's measured duration applied
    pub fn with_measured_duration(
        &self,
        clip_index: usize,
        camera: CameraId,
        seconds: f64,
    ) -> Result<Self, DomainError> {
        self.with_measured_durations(&[(clip_index, camera, seconds)])
    }

    /// A rebuilt timeline with a batch of measurements applied in one pass
    pub fn with_measured_durations(
        &self,
        measurements: &[(usize, CameraId, f64)],
    ) -> Result<Self, DomainError> {
        let mut groups = self.groups.clone();
        for &(clip_index, camera, seconds) in measurements {
            let len = groups.len();
            let group = groups
                .get_mut(clip_index)
                .ok_or(DomainError::ClipIndexOutOfRange { index: clip_index, len })?;
            *group = group.with_measured_duration(camera, seconds)?;
        }
        Ok(Self::with_detector(groups, self.detector))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ClipFile, ClipSource, FALLBACK_CLIP_DURATION_SECS};
    use chrono::NaiveDate;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn group(start_secs: f64, duration: Option<f64>) -> ClipGroup {
        let at = offset_by_seconds(base(), start_secs);
        let mut file = ClipFile::new("/clip.mp4", CameraId::Front, at, 1, ClipSource::Recent);
        file.duration = duration;
        ClipGroup::new(at, ClipSource::Recent, vec![file]).unwrap()
    }

    /// Three clips with uneven but exactly representable durations
    fn uneven() -> FootageTimeline {
        FootageTimeline::new(vec![
            group(0.0, Some(59.5)),
            group(60.0, Some(60.25)),
            group(600.0, Some(30.0)),
        ])
    }

    #[test]
    fn test_empty_timeline() {
        let timeline = FootageTimeline::default();
        assert_eq!(timeline.total_duration(), 0.0);
        assert!(timeline.resolve_footage_time(10.0).is_none());
        assert_eq!(timeline.footage_position_of(0, 5.0), 0.0);
        assert_eq!(timeline.percent_of(FootagePosition::new(0, 0.0)), 0.0);
    }

    #[test]
    fn test_total_excludes_gaps() {
        let timeline = uneven();
        assert_eq!(timeline.gaps().len(), 1);
        assert_eq!(timeline.total_duration(), 149.75);
    }

    #[test]
    fn test_round_trip() {
        let timeline = uneven();
        for (clip_index, offset) in [(0, 0.0), (0, 12.5), (1, 0.0), (1, 60.0), (2, 29.75)] {
            let footage = timeline.footage_position_of(clip_index, offset);
            let resolved = timeline.resolve_footage_time(footage).unwrap();
            assert_eq!(resolved, FootagePosition::new(clip_index, offset));
        }
    }

    #[test]
    fn test_offset_past_clip_end_is_clamped() {
        let timeline = uneven();
        assert_eq!(timeline.footage_position_of(0, 500.0), 59.5);
        // The end of clip 0 is the start of clip 1
        assert_eq!(
            timeline.resolve_footage_time(59.5).unwrap(),
            FootagePosition::new(1, 0.0)
        );
    }

    #[test]
    fn test_resolve_clamps_outside_footage() {
        let timeline = uneven();
        assert_eq!(
            timeline.resolve_footage_time(-4.0).unwrap(),
            FootagePosition::new(0, 0.0)
        );
        assert_eq!(
            timeline.resolve_footage_time(10_000.0).unwrap(),
            FootagePosition::new(2, 30.0)
        );
        assert_eq!(
            timeline.resolve_percent(150.0).unwrap(),
            FootagePosition::new(2, 30.0)
        );
    }

    #[test]
    fn test_real_time_skips_gap() {
        let timeline = uneven();
        let after_gap = timeline.resolve_footage_time(120.0).unwrap();
        assert_eq!(after_gap.clip_index, 2);
        assert_eq!(
            timeline.real_time_at(after_gap).unwrap(),
            offset_by_seconds(base(), 600.25)
        );
    }

    #[test]
    fn test_gap_queries() {
        let timeline = uneven();
        assert!(timeline.gap_after(0).is_none());
        assert_eq!(timeline.gap_after(1).unwrap().after_index, 2);
        assert_eq!(timeline.gaps_within(0, 2).count(), 1);
        assert_eq!(timeline.gaps_within(0, 1).count(), 0);
        assert_eq!(timeline.segment_of(2).unwrap().start_index, 2);
        assert_eq!(timeline.segment_of(1).unwrap().end_index, 1);
    }

    #[test]
    fn test_measured_duration_rebuilds_gaps() {
        // With the 60s fallback the second clip starts 130s after the first
        // ends: a gap. Once the first clip measures 70s it is only 120s.
        let timeline = FootageTimeline::new(vec![group(0.0, None), group(190.0, None)]);
        assert_eq!(timeline.gaps().len(), 1);
        assert_eq!(timeline.total_duration(), 2.0 * FALLBACK_CLIP_DURATION_SECS);

        let refined = timeline.with_measured_duration(0, CameraId::Front, 70.0).unwrap();
        assert!(refined.gaps().is_empty());
        assert_eq!(refined.segments().len(), 1);
        assert_eq!(refined.total_duration(), 130.0);

        // The original value is untouched
        assert_eq!(timeline.gaps().len(), 1);
        assert!(timeline.with_measured_duration(7, CameraId::Front, 70.0).is_err());
    }
}
