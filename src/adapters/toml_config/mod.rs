// TOML config adapter - Typed settings loaded from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::DEFAULT_GAP_THRESHOLD_SECS;
use crate::engine::{HardwareAcceleration, MonitorConfig, QualityTier, TimestampPosition};
use crate::error::{DashcutError, DashcutResult};
use crate::utils::logging::LoggingConfig;

/// Settings file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "dashcut.toml";

/// Complete dashcut settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Where concat lists go; the system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    pub gap_threshold_secs: f64,
    pub export: ExportSettings,
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            scratch_dir: None,
            gap_threshold_secs: DEFAULT_GAP_THRESHOLD_SECS,
            export: ExportSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[export]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    pub quality: QualityTier,
    pub hardware_acceleration: HardwareAcceleration,
    /// Burn in the wall-clock timestamp
    pub timestamp: bool,
    pub timestamp_position: TimestampPosition,
    pub font_file: Option<PathBuf>,
    pub include_audio: bool,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub stall_window_secs: u64,
    /// Output seconds per wall-clock second assumed when progress stalls
    pub assumed_throughput: f64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        let monitor = MonitorConfig::default();
        Self {
            quality: QualityTier::Full,
            hardware_acceleration: HardwareAcceleration::Auto,
            timestamp: true,
            timestamp_position: TimestampPosition::default(),
            font_file: None,
            include_audio: false,
            timeout_secs: monitor.timeout.as_secs(),
            poll_interval_ms: monitor.poll_interval.as_millis() as u64,
            stall_window_secs: monitor.stall_window.as_secs(),
            assumed_throughput: monitor.assumed_throughput,
        }
    }
}

impl Settings {
    /// Reject values that parse but make no sense
    pub fn validate(&self) -> DashcutResult<()> {
        let fail = |message: String| Err(DashcutError::Config { message });

        if !self.gap_threshold_secs.is_finite() || self.gap_threshold_secs < 0.0 {
            return fail(format!(
                "gap_threshold_secs must be a non-negative number, got {}",
                self.gap_threshold_secs
            ));
        }
        if self.ffmpeg_path.as_os_str().is_empty() || self.ffprobe_path.as_os_str().is_empty() {
            return fail("ffmpeg_path and ffprobe_path must not be empty".to_string());
        }
        if self.export.timeout_secs == 0 {
            return fail("export.timeout_secs must be greater than zero".to_string());
        }
        if self.export.poll_interval_ms == 0 {
            return fail("export.poll_interval_ms must be greater than zero".to_string());
        }
        if !self.export.assumed_throughput.is_finite() || self.export.assumed_throughput <= 0.0 {
            return fail(format!(
                "export.assumed_throughput must be positive, got {}",
                self.export.assumed_throughput
            ));
        }
        Ok(())
    }

    /// Execution monitor settings
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            scratch_dir: self.scratch_dir.clone(),
            timeout: Duration::from_secs(self.export.timeout_secs),
            poll_interval: Duration::from_millis(self.export.poll_interval_ms),
            stall_window: Duration::from_secs(self.export.stall_window_secs),
            assumed_throughput: self.export.assumed_throughput,
        }
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse and validate settings from TOML text
    pub fn parse(content: &str) -> DashcutResult<Settings> {
        let settings: Settings = toml::from_str(content).map_err(|e| DashcutError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> DashcutResult<Settings> {
        let content = std::fs::read_to_string(path).map_err(|e| DashcutError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        debug!(path = %path.display(), "Loaded settings file");
        Self::parse(&content)
    }

    /// Serialize settings, e.g. to write a starter file
    pub fn to_toml(settings: &Settings) -> DashcutResult<String> {
        toml::to_string_pretty(settings).map_err(|e| DashcutError::Config {
            message: format!("Failed to serialize config: {}", e),
        })
    }

    /// Per-user settings file: `%APPDATA%\dashcut\config.toml` on Windows,
    /// `$XDG_CONFIG_HOME/dashcut/config.toml` or `~/.config/dashcut/config.toml` elsewhere
    pub fn user_config_path() -> Option<PathBuf> {
        let base = if cfg!(windows) {
            std::env::var_os("APPDATA").map(PathBuf::from)
        } else {
            std::env::var_os("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        };
        base.map(|dir| dir.join("dashcut").join("config.toml"))
    }
}
