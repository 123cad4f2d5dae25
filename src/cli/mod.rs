//! CLI module for dashcut
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config_initialization::ConfigOverrides;
use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

pub use args::{ConfigArgs, ExportArgs, LocateArgs, SourceArgs, TimelineArgs};

/// dashcut - dashcam footage timeline and multi-camera export
///
/// Builds a gap-free footage timeline from a folder of per-camera dashcam
/// clips and exports footage-time ranges as a single composited video.
#[derive(Parser, Debug)]
#[command(name = "dashcut")]
#[command(about = "Gap-aware dashcam footage timeline and multi-camera export")]
#[command(version)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "DASHCUT_LOG_LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Log output format (pretty, compact, json)
    #[arg(long, global = true, env = "DASHCUT_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Settings file; defaults to ./dashcut.toml, then the user config dir
    #[arg(long, global = true, env = "DASHCUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, global = true, env = "DASHCUT_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable
    #[arg(long, global = true, env = "DASHCUT_FFPROBE")]
    pub ffprobe: Option<PathBuf>,

    /// Directory for temporary concat lists
    #[arg(long, global = true, env = "DASHCUT_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show clip groups, segments, gaps and total footage duration
    Timeline(TimelineArgs),
    /// Resolve a scrubber position to a clip, offset and wall-clock time
    Locate(LocateArgs),
    /// Export a footage-time range as one composited video
    Export(ExportArgs),
    /// Print the effective settings as TOML
    Config(ConfigArgs),
}

impl Cli {
    /// Settings overrides carried by the flags (and their environment variables)
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides {
            ffmpeg_path: self.ffmpeg.clone(),
            ffprobe_path: self.ffprobe.clone(),
            scratch_dir: self.scratch_dir.clone(),
            log_level: self.log_level,
            log_format: self.log_format,
            ..ConfigOverrides::default()
        };

        let source = match &self.command {
            Commands::Timeline(args) => Some(&args.source),
            Commands::Locate(args) => Some(&args.source),
            Commands::Export(args) => Some(&args.source),
            Commands::Config(_) => None,
        };
        overrides.gap_threshold_secs = source.and_then(|s| s.gap_threshold);

        if let Commands::Export(args) = &self.command {
            overrides.quality = args.quality;
            overrides.hardware_acceleration = args.hwaccel;
            overrides.timestamp = args.timestamp;
            overrides.font_file = args.font_file.clone();
            overrides.include_audio = args.audio.then_some(true);
            overrides.timeout_secs = args.timeout;
        }

        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_initialization::TimestampSetting;
    use crate::domain::model::CameraId;
    use crate::engine::{QualityTier, TimestampPosition};

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "dashcut",
            "--log-level",
            "debug",
            "export",
            "--manifest",
            "clips.json",
            "--start",
            "1:00",
            "--end",
            "90",
            "--cameras",
            "front,back",
            "--output",
            "out.mp4",
            "--quality",
            "mobile",
            "--timestamp",
            "top-left",
            "--audio",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.log_level, Some(LogLevel::Debug));
        assert_eq!(overrides.quality, Some(QualityTier::Mobile));
        assert_eq!(
            overrides.timestamp,
            Some(TimestampSetting::At(TimestampPosition::TopLeft))
        );
        assert_eq!(overrides.include_audio, Some(true));

        let Commands::Export(args) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(args.start, 60.0);
        assert_eq!(args.end, 90.0);
        assert_eq!(args.cameras, vec![CameraId::Front, CameraId::Back]);
    }

    #[test]
    fn test_source_is_required_and_exclusive() {
        assert!(Cli::try_parse_from(["dashcut", "timeline"]).is_err());
        assert!(Cli::try_parse_from(["dashcut", "timeline", "--root", "a", "--manifest", "b"]).is_err());
        assert!(Cli::try_parse_from(["dashcut", "timeline", "--root", "a"]).is_ok());
    }
}
