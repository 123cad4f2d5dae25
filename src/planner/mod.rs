//! Export planning: footage-time ranges to per-camera source slices

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::model::CameraId;
use crate::timeline::{FootagePosition, Gap};

pub mod export;

pub use export::ExportPlanner;

/// Footage-time range requested for export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRange {
    /// Footage seconds, inclusive
    pub start: f64,
    /// Footage seconds, exclusive
    pub end: f64,
    /// Cameras in grid order
    pub cameras: Vec<CameraId>,
}

impl ExportRange {
    pub fn new(start: f64, end: f64, cameras: Vec<CameraId>) -> Self {
        Self { start, end, cameras }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Part of one camera file that lands in the export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSlice {
    pub clip_index: usize,
    pub path: PathBuf,
    /// Seconds into the file where the slice starts
    pub trim_in: f64,
    /// Seconds into the file where the slice ends
    pub trim_out: f64,
    /// Length of the whole file: measured if probed, else the clip's duration
    pub file_duration: f64,
}

impl ClipSlice {
    pub fn duration(&self) -> f64 {
        (self.trim_out - self.trim_in).max(0.0)
    }
}

/// Ordered source slices for one camera
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraPlan {
    pub camera: CameraId,
    pub slices: Vec<ClipSlice>,
}

impl CameraPlan {
    /// More than one file means the transcoder reads a concat list
    pub fn needs_concat(&self) -> bool {
        self.slices.len() > 1
    }

    /// Seconds into the first file where this camera's stream starts
    pub fn trim_in(&self) -> f64 {
        self.slices.first().map_or(0.0, |s| s.trim_in)
    }

    /// Seconds of footage this camera contributes
    pub fn duration(&self) -> f64 {
        self.slices.iter().map(ClipSlice::duration).sum()
    }

    /// Length of the input stream the transcoder reads: whole files back to back
    pub fn stream_duration(&self) -> f64 {
        self.slices.iter().map(|s| s.file_duration).sum()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.slices.iter().map(|s| s.path.clone()).collect()
    }
}

/// A stretch of output that is continuous in real time. The burned-in clock
/// is seeded once per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootageRun {
    /// Seconds into the output where the run begins
    pub output_start: f64,
    pub duration: f64,
    /// Wall-clock instant shown at `output_start`
    pub real_start: NaiveDateTime,
}

/// Non-fatal findings the caller should surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportWarning {
    /// The camera has no file for some clips in the range, so its stream is
    /// shorter than the others and the grid drifts out of sync after the hole
    PartialCoverage {
        camera: CameraId,
        missing_clips: Vec<usize>,
    },
}

/// Resolved export: per-camera source slices plus what was left out
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPlan {
    pub range: ExportRange,
    pub start: FootagePosition,
    /// Last footage position included (clip end when the range ends on a boundary)
    pub end: FootagePosition,
    pub cameras: Vec<CameraPlan>,
    /// Requested cameras with no footage anywhere in the range
    pub omitted: Vec<CameraId>,
    /// Real-time gaps between the first and last clip; invisible in footage time
    pub crossed_gaps: Vec<Gap>,
    pub runs: Vec<FootageRun>,
    pub warnings: Vec<ExportWarning>,
}

impl ExportPlan {
    /// Output length in seconds
    pub fn duration(&self) -> f64 {
        self.range.duration()
    }

    pub fn camera(&self, camera: CameraId) -> Option<&CameraPlan> {
        self.cameras.iter().find(|c| c.camera == camera)
    }

    /// Camera whose audio track is exported, if it made it into the plan
    pub fn audio_camera(&self) -> Option<CameraId> {
        self.cameras
            .iter()
            .map(|c| c.camera)
            .find(CameraId::is_primary)
    }

    /// Wall-clock instant at the first exported frame
    pub fn real_start(&self) -> Option<NaiveDateTime> {
        self.runs.first().map(|r| r.real_start)
    }
}
