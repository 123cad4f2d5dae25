//! Video encoder selection and encoding parameters

use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::engine::QualityTier;

/// Hardware acceleration options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareAcceleration {
    /// No hardware acceleration (software only)
    None,
    /// NVIDIA NVENC encoder
    Nvenc,
    /// Intel Quick Sync Video
    Qsv,
    /// AMD VCE/AMF
    Amf,
    /// Apple VideoToolbox (macOS)
    VideoToolbox,
    /// Auto-detect best available
    #[default]
    Auto,
}

impl HardwareAcceleration {
    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareAcceleration::None => "none",
            HardwareAcceleration::Nvenc => "nvenc",
            HardwareAcceleration::Qsv => "qsv",
            HardwareAcceleration::Amf => "amf",
            HardwareAcceleration::VideoToolbox => "videotoolbox",
            HardwareAcceleration::Auto => "auto",
        }
    }

    /// Encoder for an explicit choice; `None` for `Auto`, which needs probing
    pub fn explicit_encoder(&self) -> Option<VideoEncoder> {
        match self {
            HardwareAcceleration::None => Some(VideoEncoder::Libx264),
            HardwareAcceleration::Nvenc => Some(VideoEncoder::Nvenc),
            HardwareAcceleration::Qsv => Some(VideoEncoder::Qsv),
            HardwareAcceleration::Amf => Some(VideoEncoder::Amf),
            HardwareAcceleration::VideoToolbox => Some(VideoEncoder::VideoToolbox),
            HardwareAcceleration::Auto => None,
        }
    }

    /// Pick an encoder given the output of `ffmpeg -encoders`
    pub fn select(&self, encoder_listing: &str) -> VideoEncoder {
        if let Some(encoder) = self.explicit_encoder() {
            return encoder;
        }
        VideoEncoder::HARDWARE_PREFERENCE
            .iter()
            .copied()
            .find(|encoder| encoder.is_listed(encoder_listing))
            .unwrap_or(VideoEncoder::Libx264)
    }

    /// Resolve to a concrete encoder, asking the transcoder what it supports
    /// when auto-detecting. Falls back to software if the probe fails.
    pub async fn resolve(&self, ffmpeg_path: &Path) -> VideoEncoder {
        if let Some(encoder) = self.explicit_encoder() {
            return encoder;
        }
        match list_encoders(ffmpeg_path).await {
            Ok(listing) => {
                let encoder = self.select(&listing);
                info!(encoder = encoder.codec_name(), "Auto-detected video encoder");
                encoder
            }
            Err(e) => {
                warn!(error = %e, "Could not list encoders, using software encoding");
                VideoEncoder::Libx264
            }
        }
    }
}

impl fmt::Display for HardwareAcceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HardwareAcceleration {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "software" | "cpu" => Ok(HardwareAcceleration::None),
            "nvenc" | "nvidia" => Ok(HardwareAcceleration::Nvenc),
            "qsv" | "intel" => Ok(HardwareAcceleration::Qsv),
            "amf" | "amd" => Ok(HardwareAcceleration::Amf),
            "videotoolbox" | "vt" => Ok(HardwareAcceleration::VideoToolbox),
            "auto" => Ok(HardwareAcceleration::Auto),
            other => Err(DomainError::BadArgs(format!(
                "unknown hardware acceleration '{}'",
                other
            ))),
        }
    }
}

/// Concrete H.264 encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VideoEncoder {
    Libx264,
    Nvenc,
    Qsv,
    Amf,
    VideoToolbox,
}

impl VideoEncoder {
    /// Order tried when auto-detecting
    pub const HARDWARE_PREFERENCE: [VideoEncoder; 4] = [
        VideoEncoder::Nvenc,
        VideoEncoder::Qsv,
        VideoEncoder::Amf,
        VideoEncoder::VideoToolbox,
    ];

    pub fn codec_name(&self) -> &'static str {
        match self {
            VideoEncoder::Libx264 => "libx264",
            VideoEncoder::Nvenc => "h264_nvenc",
            VideoEncoder::Qsv => "h264_qsv",
            VideoEncoder::Amf => "h264_amf",
            VideoEncoder::VideoToolbox => "h264_videotoolbox",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, VideoEncoder::Libx264)
    }

    /// True when `ffmpeg -encoders` output lists this encoder
    fn is_listed(&self, listing: &str) -> bool {
        listing
            .lines()
            .any(|line| line.split_whitespace().nth(1) == Some(self.codec_name()))
    }

    /// `-c:v` and rate-control arguments for a quality tier
    pub fn args(&self, quality: QualityTier) -> Vec<String> {
        let mobile = quality == QualityTier::Mobile;
        let mut args = vec!["-c:v".to_string(), self.codec_name().to_string()];

        let tuning: Vec<String> = match self {
            VideoEncoder::Libx264 => vec![
                "-preset".into(),
                "medium".into(),
                "-crf".into(),
                if mobile { "23" } else { "20" }.into(),
                "-threads".into(),
                num_cpus::get().to_string(),
            ],
            VideoEncoder::Nvenc => vec![
                "-preset".into(),
                "p4".into(),
                "-rc".into(),
                "vbr".into(),
                "-cq".into(),
                if mobile { "25" } else { "21" }.into(),
            ],
            VideoEncoder::Qsv => vec![
                "-preset".into(),
                "medium".into(),
                "-global_quality".into(),
                if mobile { "25" } else { "21" }.into(),
            ],
            VideoEncoder::Amf => vec![
                "-quality".into(),
                "balanced".into(),
                "-rc".into(),
                "cqp".into(),
                "-qp_i".into(),
                if mobile { "24" } else { "20" }.into(),
                "-qp_p".into(),
                if mobile { "26" } else { "22" }.into(),
            ],
            VideoEncoder::VideoToolbox => vec![
                "-b:v".into(),
                if mobile { "8M" } else { "20M" }.into(),
                "-allow_sw".into(),
                "1".into(),
            ],
        };

        args.extend(tuning);
        args
    }
}

impl fmt::Display for VideoEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec_name())
    }
}

/// Run `ffmpeg -hide_banner -encoders` and return its stdout
pub async fn list_encoders(ffmpeg_path: &Path) -> std::io::Result<String> {
    debug!(ffmpeg = %ffmpeg_path.display(), "Listing encoders");
    let output = Command::new(ffmpeg_path)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await?;
    if !output.status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("encoder listing exited with {}", output.status),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
