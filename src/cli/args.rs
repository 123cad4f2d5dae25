//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::config_initialization::TimestampSetting;
use crate::domain::model::{CameraId, TimeSpec};
use crate::engine::{HardwareAcceleration, QualityTier};

/// Footage-time argument: seconds, `MM:SS(.ms)` or `HH:MM:SS(.ms)`
fn parse_footage_time(value: &str) -> Result<f64, String> {
    TimeSpec::parse(value)
        .map(|t| t.as_seconds())
        .map_err(|e| e.to_string())
}

/// Where clips come from; shared by every timeline-based command
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Dashcam folder to scan (e.g. the TeslaCam directory)
    #[arg(long, required_unless_present = "manifest", conflicts_with = "manifest")]
    pub root: Option<PathBuf>,

    /// JSON clip manifest to read instead of scanning
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Measure clip durations with ffprobe instead of assuming 60s
    #[arg(long)]
    pub probe: bool,

    /// Seconds of missing real time that count as a gap
    #[arg(long, env = "DASHCUT_GAP_THRESHOLD")]
    pub gap_threshold: Option<f64>,
}

/// Arguments for the timeline command
#[derive(Args, Debug)]
pub struct TimelineArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the locate command
#[derive(Args, Debug)]
pub struct LocateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Scrubber position in percent (0-100)
    #[arg(long, required_unless_present = "at", conflicts_with = "at")]
    pub percent: Option<f64>,

    /// Footage time (seconds, MM:SS.ms or HH:MM:SS.ms)
    #[arg(long, value_parser = parse_footage_time)]
    pub at: Option<f64>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Start in footage time (seconds, MM:SS.ms or HH:MM:SS.ms)
    #[arg(short, long, value_parser = parse_footage_time)]
    pub start: f64,

    /// End in footage time, exclusive
    #[arg(short, long, value_parser = parse_footage_time)]
    pub end: f64,

    /// Cameras in grid order, comma separated (default: every camera)
    #[arg(long, value_delimiter = ',')]
    pub cameras: Vec<CameraId>,

    /// Output video file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output quality (full, mobile)
    #[arg(long, env = "DASHCUT_QUALITY")]
    pub quality: Option<QualityTier>,

    /// Timestamp position (top-left ... bottom-right) or `none`
    #[arg(long, env = "DASHCUT_TIMESTAMP")]
    pub timestamp: Option<TimestampSetting>,

    /// Font file for the timestamp
    #[arg(long)]
    pub font_file: Option<PathBuf>,

    /// Hardware encoder (auto, none, nvenc, qsv, amf, videotoolbox)
    #[arg(long, env = "DASHCUT_HWACCEL")]
    pub hwaccel: Option<HardwareAcceleration>,

    /// Include the front camera's audio
    #[arg(long)]
    pub audio: bool,

    /// Give up after this many seconds
    #[arg(long, env = "DASHCUT_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    /// Print the plan and command without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print built-in defaults instead of the effective settings
    #[arg(long)]
    pub defaults: bool,
}
