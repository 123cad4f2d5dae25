//! FFprobe adapter for measuring clip durations

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{DashcutError, DashcutResult};
use crate::ports::ProbePort;

/// Probe adapter backed by the `ffprobe` executable
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    ffprobe_path: PathBuf,
}

impl Default for FfprobeAdapter {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeAdapter {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe_path
    }
}

/// Parse the container duration printed by
/// `-show_entries format=duration -of default=nw=1:nk=1`
pub fn parse_duration_output(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe_duration(&self, file_path: &Path) -> DashcutResult<f64> {
        let probe_error = |message: String| DashcutError::Probe {
            path: file_path.display().to_string(),
            message,
        };

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "default=nw=1:nk=1"])
            .arg(file_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| probe_error(format!("failed to run {}: {}", self.ffprobe_path.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(probe_error(format!("ffprobe failed: {}", stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let seconds = parse_duration_output(&stdout)
            .ok_or_else(|| probe_error(format!("no usable duration in {:?}", stdout.trim())))?;
        debug!(path = %file_path.display(), seconds, "Probed duration");
        Ok(seconds)
    }
}
