//! Configuration initialization and hierarchy management
//!
//! Precedence: CLI flags > `DASHCUT_*` environment variables > settings file >
//! built-in defaults. Clap resolves the first two (every overridable flag is
//! declared with `env = ...`); this module layers the result over the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use crate::adapters::toml_config::{Settings, TomlConfigAdapter, LOCAL_CONFIG_FILE};
use crate::domain::errors::DomainError;
use crate::engine::{HardwareAcceleration, QualityTier, TimestampPosition};
use crate::error::{DashcutError, DashcutResult};
use crate::utils::logging::{LogFormat, LogLevel};

/// `--timestamp` value: an anchor, or `none` to disable the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSetting {
    Off,
    At(TimestampPosition),
}

impl FromStr for TimestampSetting {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" | "false" => Ok(TimestampSetting::Off),
            other => other.parse().map(TimestampSetting::At),
        }
    }
}

/// Values from the command line or environment that beat the settings file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub scratch_dir: Option<PathBuf>,
    pub gap_threshold_secs: Option<f64>,
    pub log_level: Option<LogLevel>,
    pub log_format: Option<LogFormat>,
    pub quality: Option<QualityTier>,
    pub hardware_acceleration: Option<HardwareAcceleration>,
    pub timestamp: Option<TimestampSetting>,
    pub font_file: Option<PathBuf>,
    pub include_audio: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Apply every override that is set
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.ffmpeg_path {
            settings.ffmpeg_path = path.clone();
        }
        if let Some(path) = &self.ffprobe_path {
            settings.ffprobe_path = path.clone();
        }
        if let Some(dir) = &self.scratch_dir {
            settings.scratch_dir = Some(dir.clone());
        }
        if let Some(threshold) = self.gap_threshold_secs {
            settings.gap_threshold_secs = threshold;
        }
        if let Some(level) = self.log_level {
            settings.logging.level = level;
        }
        if let Some(format) = self.log_format {
            settings.logging.format = format;
        }
        if let Some(quality) = self.quality {
            settings.export.quality = quality;
        }
        if let Some(hwaccel) = self.hardware_acceleration {
            settings.export.hardware_acceleration = hwaccel;
        }
        match self.timestamp {
            Some(TimestampSetting::Off) => settings.export.timestamp = false,
            Some(TimestampSetting::At(position)) => {
                settings.export.timestamp = true;
                settings.export.timestamp_position = position;
            }
            None => {}
        }
        if let Some(font) = &self.font_file {
            settings.export.font_file = Some(font.clone());
        }
        if let Some(audio) = self.include_audio {
            settings.export.include_audio = audio;
        }
        if let Some(timeout) = self.timeout_secs {
            settings.export.timeout_secs = timeout;
        }
    }
}

/// Settings file to read: the explicit path (which must exist), else
/// `dashcut.toml` in `working_dir`, else the per-user file if present
pub fn locate_config_file(explicit: Option<&Path>, working_dir: &Path) -> DashcutResult<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(DashcutError::Config {
                message: format!("Config file does not exist: {}", path.display()),
            });
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = working_dir.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    Ok(TomlConfigAdapter::user_config_path().filter(|path| path.is_file()))
}

/// Resolve the full configuration hierarchy
pub fn load_settings(explicit: Option<&Path>, overrides: &ConfigOverrides) -> DashcutResult<Settings> {
    let working_dir = std::env::current_dir()?;
    let mut settings = match locate_config_file(explicit, &working_dir)? {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            TomlConfigAdapter::load(&path)?
        }
        None => {
            debug!("No configuration file found, using defaults");
            Settings::default()
        }
    };

    overrides.apply(&mut settings);
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_timestamp_setting() {
        assert_eq!("none".parse::<TimestampSetting>().unwrap(), TimestampSetting::Off);
        assert_eq!(
            "top-left".parse::<TimestampSetting>().unwrap(),
            TimestampSetting::At(TimestampPosition::TopLeft)
        );
        assert!("sideways".parse::<TimestampSetting>().is_err());
    }

    #[test]
    fn test_overrides_beat_file() {
        let mut settings = TomlConfigAdapter::parse(
            "ffmpeg_path = \"/file/ffmpeg\"\n[export]\nquality = \"mobile\"\ntimestamp = true\n",
        )
        .unwrap();
        let overrides = ConfigOverrides {
            ffmpeg_path: Some(PathBuf::from("/cli/ffmpeg")),
            timestamp: Some(TimestampSetting::Off),
            ..Default::default()
        };
        overrides.apply(&mut settings);

        assert_eq!(settings.ffmpeg_path, PathBuf::from("/cli/ffmpeg"));
        assert!(!settings.export.timestamp);
        // Untouched values keep the file's setting
        assert_eq!(settings.export.quality, QualityTier::Mobile);
    }

    #[test]
    fn test_local_file_is_found() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            locate_config_file(None, dir.path()).unwrap().filter(|p| p.starts_with(dir.path())),
            None
        );

        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), "").unwrap();
        assert_eq!(
            locate_config_file(None, dir.path()).unwrap(),
            Some(dir.path().join(LOCAL_CONFIG_FILE))
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(locate_config_file(Some(&missing), dir.path()).is_err());
    }
}
