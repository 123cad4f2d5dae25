// Domain models - Core types and data structures

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Duration assumed for a clip group until at least one of its files has been probed
pub const FALLBACK_CLIP_DURATION_SECS: f64 = 60.0;

/// Real-time distance between two clips above which the footage has a gap
pub const DEFAULT_GAP_THRESHOLD_SECS: f64 = 120.0;

/// The back camera's recording starts roughly one second ahead of the
/// other cameras sharing its timestamp. Exports skip this much of every
/// back-camera file so the grid lines up.
pub const BACK_CAMERA_SYNC_OFFSET_SECS: f64 = 1.0;

/// Physical camera positions on the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraId {
    Front,
    Back,
    LeftRepeater,
    RightRepeater,
    LeftPillar,
    RightPillar,
}

impl CameraId {
    /// Every camera, in canonical order
    pub const ALL: [CameraId; 6] = [
        CameraId::Front,
        CameraId::Back,
        CameraId::LeftRepeater,
        CameraId::RightRepeater,
        CameraId::LeftPillar,
        CameraId::RightPillar,
    ];

    /// Name used in clip filenames and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraId::Front => "front",
            CameraId::Back => "back",
            CameraId::LeftRepeater => "left_repeater",
            CameraId::RightRepeater => "right_repeater",
            CameraId::LeftPillar => "left_pillar",
            CameraId::RightPillar => "right_pillar",
        }
    }

    /// Rear-facing cameras are shown mirrored, like a rear-view mirror
    pub fn is_mirrored(&self) -> bool {
        match self {
            CameraId::Back | CameraId::LeftRepeater | CameraId::RightRepeater => true,
            CameraId::Front | CameraId::LeftPillar | CameraId::RightPillar => false,
        }
    }

    /// Seconds to skip at the start of this camera's files to line it up with the rest
    pub fn sync_offset_secs(&self) -> f64 {
        match self {
            CameraId::Back => BACK_CAMERA_SYNC_OFFSET_SECS,
            _ => 0.0,
        }
    }

    /// Only the front camera carries the export's audio track
    pub fn is_primary(&self) -> bool {
        matches!(self, CameraId::Front)
    }

    /// Parse a comma separated camera list such as `front,back`
    pub fn parse_list(list: &str) -> Result<Vec<CameraId>, DomainError> {
        let mut cameras = Vec::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let camera = name.parse::<CameraId>()?;
            if !cameras.contains(&camera) {
                cameras.push(camera);
            }
        }
        Ok(cameras)
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        CameraId::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownCamera(s.to_string()))
    }
}

/// Folder category a clip was recorded into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipSource {
    /// Saved by the driver
    UserSaved,
    /// Triggered by sentry mode
    Sentry,
    /// Continuous background recording
    Recent,
}

impl ClipSource {
    /// Classify from a folder name (`SavedClips`, `SentryClips`, `RecentClips`)
    pub fn from_folder_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "savedclips" => Some(ClipSource::UserSaved),
            "sentryclips" => Some(ClipSource::Sentry),
            "recentclips" => Some(ClipSource::Recent),
            _ => None,
        }
    }
}

impl fmt::Display for ClipSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClipSource::UserSaved => "saved",
            ClipSource::Sentry => "sentry",
            ClipSource::Recent => "recent",
        };
        f.write_str(name)
    }
}

/// One camera's recording for one clip timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipFile {
    pub path: PathBuf,
    pub camera: CameraId,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub size: u64,
    /// Measured duration in seconds, once probed
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default = "default_source")]
    pub source: ClipSource,
}

fn default_source() -> ClipSource {
    ClipSource::Recent
}

impl ClipFile {
    /// Create a file descriptor whose duration has not been measured yet
    pub fn new(
        path: impl Into<PathBuf>,
        camera: CameraId,
        timestamp: NaiveDateTime,
        size: u64,
        source: ClipSource,
    ) -> Self {
        Self {
            path: path.into(),
            camera,
            timestamp,
            size,
            duration: None,
            source,
        }
    }

    /// Attach a measured duration
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// All camera files sharing one nominal capture timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct ClipGroup {
    timestamp: NaiveDateTime,
    source: ClipSource,
    files: BTreeMap<CameraId, ClipFile>,
    duration: f64,
}

impl ClipGroup {
    /// Build a group from its camera files.
    ///
    /// Every file must carry `timestamp` and each camera may appear once.
    pub fn new(
        timestamp: NaiveDateTime,
        source: ClipSource,
        files: Vec<ClipFile>,
    ) -> Result<Self, DomainError> {
        if files.is_empty() {
            return Err(DomainError::MalformedInput(format!(
                "clip group {} has no camera files",
                timestamp
            )));
        }

        let mut by_camera = BTreeMap::new();
        for file in files {
            if file.timestamp != timestamp {
                return Err(DomainError::MalformedInput(format!(
                    "file {} has timestamp {} but its group is {}",
                    file.path.display(),
                    file.timestamp,
                    timestamp
                )));
            }
            let camera = file.camera;
            if by_camera.insert(camera, file).is_some() {
                return Err(DomainError::MalformedInput(format!(
                    "clip group {} has two {} files",
                    timestamp, camera
                )));
            }
        }

        let duration = Self::effective_duration(&by_camera);
        Ok(Self {
            timestamp,
            source,
            files: by_camera,
            duration,
        })
    }

    /// Longest measured file duration, or the fallback when nothing was measured
    fn effective_duration(files: &BTreeMap<CameraId, ClipFile>) -> f64 {
        files
            .values()
            .filter_map(|f| f.duration)
            .filter(|d| d.is_finite() && *d > 0.0)
            .fold(None, |max: Option<f64>, d| Some(max.map_or(d, |m| m.max(d))))
            .unwrap_or(FALLBACK_CLIP_DURATION_SECS)
    }

    /// Nominal clip start (wall clock, local)
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn source(&self) -> ClipSource {
        self.source
    }

    /// Effective duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// True once at least one camera file has a measured duration
    pub fn is_measured(&self) -> bool {
        self.files.values().any(|f| f.duration.is_some())
    }

    /// Wall-clock instant at which this clip's footage ends
    pub fn end_time(&self) -> NaiveDateTime {
        offset_by_seconds(self.timestamp, self.duration)
    }

    pub fn file(&self, camera: CameraId) -> Option<&ClipFile> {
        self.files.get(&camera)
    }

    pub fn has_camera(&self, camera: CameraId) -> bool {
        self.files.contains_key(&camera)
    }

    /// Cameras present in this group, in canonical order
    pub fn cameras(&self) -> impl Iterator<Item = CameraId> + '_ {
        self.files.keys().copied()
    }

    pub fn files(&self) -> impl Iterator<Item = &ClipFile> {
        self.files.values()
    }

    /// Camera whose media events drive the playback position
    pub fn reference_camera(&self) -> CameraId {
        if self.has_camera(CameraId::Front) {
            CameraId::Front
        } else {
            // Groups are never empty
            self.files.keys().next().copied().unwrap_or(CameraId::Front)
        }
    }

    /// A copy of this group with one camera's measured duration filled in
    pub fn with_measured_duration(&self, camera: CameraId, seconds: f64) -> Result<Self, DomainError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(DomainError::BadArgs(format!(
                "measured duration must be positive, got {}",
                seconds
            )));
        }
        let mut files = self.files.clone();
        let file = files.get_mut(&camera).ok_or_else(|| {
            DomainError::BadArgs(format!(
                "clip group {} has no {} file",
                self.timestamp, camera
            ))
        })?;
        file.duration = Some(seconds);

        let duration = Self::effective_duration(&files);
        Ok(Self {
            timestamp: self.timestamp,
            source: self.source,
            files,
            duration,
        })
    }
}

/// Signed seconds from `from` to `to`
pub fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// `instant` shifted by `seconds` (millisecond resolution)
pub fn offset_by_seconds(instant: NaiveDateTime, seconds: f64) -> NaiveDateTime {
    instant + chrono::Duration::milliseconds((seconds * 1000.0).round() as i64)
}

/// Footage time entered by a user, in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse `123.45`, `MM:SS(.ms)` or `HH:MM:SS(.ms)`
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(DomainError::BadArgs(format!(
                    "Time must be a non-negative number: {}",
                    trimmed
                )));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds_part) = match parts.as_slice() {
            [m, s] => ("0", *m, *s),
            [h, m, s] => (*h, *m, *s),
            _ => {
                return Err(DomainError::BadArgs(format!(
                    "Invalid time '{}'. Supported formats: seconds (123.45), MM:SS.ms (2:30.5), HH:MM:SS.ms (1:02:30.5)",
                    trimmed
                )))
            }
        };

        let hours = hours
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid hours in '{}'", trimmed)))?;
        let minutes = minutes
            .parse::<u32>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid minutes in '{}'", trimmed)))?;
        let seconds = seconds_part
            .parse::<f64>()
            .map_err(|_| DomainError::BadArgs(format!("Invalid seconds in '{}'", trimmed)))?;

        if parts.len() == 3 && minutes >= 60 {
            return Err(DomainError::BadArgs("Minutes must be less than 60".to_string()));
        }
        if !(0.0..60.0).contains(&seconds) {
            return Err(DomainError::BadArgs("Seconds must be less than 60".to_string()));
        }

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
        ))
    }

    /// Format as `H:MM:SS.mmm` or `M:SS.mmm`
    pub fn format_hms(&self) -> String {
        let total_ms = (self.seconds * 1000.0).round().max(0.0) as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let millis = total_ms % 1000;

        if hours > 0 {
            format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
        } else {
            format!("{}:{:02}.{:03}", minutes, seconds, millis)
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

#[cfg(test)]
mod tests;
