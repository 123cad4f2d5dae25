//! Export engine: transcoder command synthesis and execution

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

pub mod command;
pub mod encoder;
pub mod layout;
pub mod monitor;
pub mod overlay;
pub mod progress;

pub use command::{CommandBuilder, CommandSpec, InputSource, InputSpec};
pub use encoder::{HardwareAcceleration, VideoEncoder};
pub use layout::GridLayout;
pub use monitor::{CancelHandle, ExportMonitor, MonitorConfig};
pub use overlay::{OverlayStyle, TimestampOverlay, TimestampPosition};
pub use progress::{ExportProgress, ProgressCallback, ProgressTracker};

/// Output quality tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Composite at reference resolution
    #[default]
    Full,
    /// Composite rescaled to a 1080 short edge
    Mobile,
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::Full => f.write_str("full"),
            QualityTier::Mobile => f.write_str("mobile"),
        }
    }
}

impl FromStr for QualityTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(QualityTier::Full),
            "mobile" => Ok(QualityTier::Mobile),
            other => Err(DomainError::BadArgs(format!(
                "unknown quality '{}', expected full or mobile",
                other
            ))),
        }
    }
}

/// Per-export options for the command builder
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub output: PathBuf,
    pub quality: QualityTier,
    /// Burned-in clock; `None` disables it
    pub timestamp: Option<TimestampOverlay>,
    /// Carry the front camera's audio track
    pub include_audio: bool,
}

impl ExportOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            quality: QualityTier::Full,
            timestamp: None,
            include_audio: false,
        }
    }

    pub fn with_quality(mut self, quality: QualityTier) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_timestamp(mut self, overlay: Option<TimestampOverlay>) -> Self {
        self.timestamp = overlay;
        self
    }

    pub fn with_audio(mut self, include_audio: bool) -> Self {
        self.include_audio = include_audio;
        self
    }
}
