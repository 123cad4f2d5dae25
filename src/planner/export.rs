//! Export planner

use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::{offset_by_seconds, CameraId};
use crate::planner::{CameraPlan, ClipSlice, ExportPlan, ExportRange, ExportWarning, FootageRun};
use crate::timeline::{FootagePosition, FootageTimeline};

/// Slack for float comparisons on footage boundaries
const BOUNDARY_EPSILON: f64 = 1e-6;

/// Resolves export ranges against a timeline
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportPlanner;

impl ExportPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `range` to per-camera slices.
    ///
    /// Fails with `InvalidRange` unless `0 <= start < end <= total` and with
    /// `EmptyExport` when none of the cameras has footage in the range.
    /// Cameras missing from every clip are omitted rather than failing.
    pub fn plan(&self, timeline: &FootageTimeline, range: &ExportRange) -> Result<ExportPlan, DomainError> {
        let total = timeline.total_duration();
        let invalid = || DomainError::InvalidRange {
            start: range.start,
            end: range.end,
            total,
        };

        if !range.start.is_finite() || !range.end.is_finite() {
            return Err(invalid());
        }
        if range.start < 0.0 || range.end > total + BOUNDARY_EPSILON || range.start >= range.end {
            return Err(invalid());
        }

        let mut cameras: Vec<CameraId> = Vec::with_capacity(range.cameras.len());
        for &camera in &range.cameras {
            if !cameras.contains(&camera) {
                cameras.push(camera);
            }
        }
        if cameras.is_empty() {
            return Err(DomainError::EmptyExport { requested: cameras });
        }

        let start = timeline.resolve_footage_time(range.start).ok_or_else(invalid)?;
        let end = self.resolve_end(timeline, range.end.min(total), start).ok_or_else(invalid)?;
        debug!(?start, ?end, "Export range resolved");

        let mut camera_plans = Vec::new();
        let mut omitted = Vec::new();
        let mut warnings = Vec::new();

        for camera in cameras.iter().copied() {
            let mut slices = Vec::new();
            let mut missing_clips = Vec::new();

            for clip_index in start.clip_index..=end.clip_index {
                let Some((trim_in, trim_out)) = Self::clip_window(timeline, clip_index, start, end) else {
                    continue;
                };
                let Some(group) = timeline.group(clip_index) else {
                    continue;
                };
                match group.file(camera) {
                    Some(file) => slices.push(ClipSlice {
                        clip_index,
                        path: file.path.clone(),
                        trim_in,
                        trim_out,
                        file_duration: file.duration.filter(|d| *d > 0.0).unwrap_or_else(|| group.duration()),
                    }),
                    None => missing_clips.push(clip_index),
                }
            }

            if slices.is_empty() {
                info!(%camera, "Camera has no footage in export range, omitting");
                omitted.push(camera);
                continue;
            }
            if !missing_clips.is_empty() {
                warn!(%camera, ?missing_clips, "Camera is missing clips inside export range");
                warnings.push(ExportWarning::PartialCoverage {
                    camera,
                    missing_clips,
                });
            }
            camera_plans.push(CameraPlan { camera, slices });
        }

        if camera_plans.is_empty() {
            return Err(DomainError::EmptyExport { requested: cameras });
        }

        let crossed_gaps: Vec<_> = timeline
            .gaps_within(start.clip_index, end.clip_index)
            .cloned()
            .collect();
        if !crossed_gaps.is_empty() {
            info!(
                gaps = crossed_gaps.len(),
                "Export range spans missing footage; the output cuts straight across it"
            );
        }

        let runs = Self::runs(timeline, start, end);

        Ok(ExportPlan {
            range: ExportRange::new(range.start, range.end.min(total), cameras),
            start,
            end,
            cameras: camera_plans,
            omitted,
            crossed_gaps,
            runs,
            warnings,
        })
    }

    /// The exclusive end resolves to offset 0 of the next clip when it sits on
    /// a clip boundary. That clip contributes nothing, so end at the previous
    /// clip's full duration instead.
    fn resolve_end(
        &self,
        timeline: &FootageTimeline,
        end: f64,
        start: FootagePosition,
    ) -> Option<FootagePosition> {
        let resolved = timeline.resolve_footage_time(end)?;
        if resolved.offset <= BOUNDARY_EPSILON && resolved.clip_index > start.clip_index {
            let previous = resolved.clip_index - 1;
            let duration = timeline.group(previous)?.duration();
            return Some(FootagePosition::new(previous, duration));
        }
        Some(resolved)
    }

    /// In-clip window `[trim_in, trim_out]` of `clip_index` covered by the range
    fn clip_window(
        timeline: &FootageTimeline,
        clip_index: usize,
        start: FootagePosition,
        end: FootagePosition,
    ) -> Option<(f64, f64)> {
        let duration = timeline.group(clip_index)?.duration();
        let trim_in = if clip_index == start.clip_index { start.offset } else { 0.0 };
        let trim_out = if clip_index == end.clip_index { end.offset } else { duration };
        (trim_out - trim_in > BOUNDARY_EPSILON).then_some((trim_in, trim_out))
    }

    /// Split the range wherever a real-time gap falls between two clips
    fn runs(timeline: &FootageTimeline, start: FootagePosition, end: FootagePosition) -> Vec<FootageRun> {
        let mut runs: Vec<FootageRun> = Vec::new();
        let mut cursor = 0.0;

        for clip_index in start.clip_index..=end.clip_index {
            let Some((trim_in, trim_out)) = Self::clip_window(timeline, clip_index, start, end) else {
                continue;
            };
            let Some(group) = timeline.group(clip_index) else {
                continue;
            };
            let length = trim_out - trim_in;

            let after_gap = clip_index > start.clip_index && timeline.gap_after(clip_index - 1).is_some();
            match runs.last_mut() {
                Some(run) if !after_gap => run.duration += length,
                _ => runs.push(FootageRun {
                    output_start: cursor,
                    duration: length,
                    real_start: offset_by_seconds(group.timestamp(), trim_in),
                }),
            }
            cursor += length;
        }
        runs
    }
}
