// Manifest adapter - Clip lists described in JSON instead of found on disk

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::info;

use crate::domain::model::*;
use crate::domain::rules::MIN_VIABLE_CLIP_BYTES;
use crate::error::{DashcutError, DashcutResult};
use crate::ports::ScanPort;

/// One manifest entry. `size` falls back to the file on disk, and to a
/// viable size when the file does not exist.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestEntry {
    path: PathBuf,
    camera: CameraId,
    timestamp: NaiveDateTime,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    source: Option<ClipSource>,
}

impl ManifestEntry {
    async fn into_clip_file(self) -> ClipFile {
        let size = match self.size {
            Some(size) => size,
            None => tokio::fs::metadata(&self.path)
                .await
                .map(|m| m.len())
                .unwrap_or(MIN_VIABLE_CLIP_BYTES),
        };
        let file = ClipFile::new(
            self.path,
            self.camera,
            self.timestamp,
            size,
            self.source.unwrap_or(ClipSource::Recent),
        );
        match self.duration {
            Some(seconds) => file.with_duration(seconds),
            None => file,
        }
    }
}

/// Reads a JSON array of clip files
#[derive(Debug, Clone)]
pub struct ManifestScanner {
    path: PathBuf,
}

impl ManifestScanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse manifest text, reading missing sizes from disk
    pub async fn parse(content: &str) -> DashcutResult<Vec<ClipFile>> {
        let entries: Vec<ManifestEntry> = serde_json::from_str(content).map_err(|e| DashcutError::Scan {
            message: format!("invalid clip manifest: {}", e),
        })?;
        let mut files = Vec::with_capacity(entries.len());
        for entry in entries {
            files.push(entry.into_clip_file().await);
        }
        Ok(files)
    }
}

#[async_trait]
impl ScanPort for ManifestScanner {
    async fn scan(&self) -> DashcutResult<Vec<ClipFile>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| DashcutError::Scan {
            message: format!("failed to read manifest {}: {}", self.path.display(), e),
        })?;
        let files = Self::parse(&content).await?;
        info!(manifest = %self.path.display(), files = files.len(), "Loaded clip manifest");
        Ok(files)
    }
}
