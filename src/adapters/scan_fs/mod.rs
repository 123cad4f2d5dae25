//! Filesystem scanner for dashcam folders
//!
//! Finds `YYYY-MM-DD_HH-MM-SS-<camera>.mp4` files below a root directory and
//! classifies each by the `SavedClips` / `SentryClips` / `RecentClips` folder
//! it sits in.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::model::*;
use crate::error::{DashcutError, DashcutResult};
use crate::ports::ScanPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const TIMESTAMP_LEN: usize = 19;

/// Scanner over a directory tree
#[derive(Debug, Clone)]
pub struct FsScanner {
    root: PathBuf,
}

impl FsScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Blocking walk of the tree
    pub fn scan_blocking(&self) -> DashcutResult<Vec<ClipFile>> {
        if !self.root.is_dir() {
            return Err(DashcutError::Scan {
                message: format!("{} is not a directory", self.root.display()),
            });
        }

        let mut files = Vec::new();
        let mut skipped = 0usize;

        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some((timestamp, camera)) = parse_clip_file_name(path) else {
                debug!(path = %path.display(), "Skipping file that is not a camera clip");
                skipped += 1;
                continue;
            };
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let source = classify_source(path, &self.root);
            files.push(ClipFile::new(path, camera, timestamp, size, source));
        }

        info!(
            root = %self.root.display(),
            files = files.len(),
            skipped,
            "Scanned clip folder"
        );
        Ok(files)
    }
}

#[async_trait]
impl ScanPort for FsScanner {
    async fn scan(&self) -> DashcutResult<Vec<ClipFile>> {
        let scanner = self.clone();
        tokio::task::spawn_blocking(move || scanner.scan_blocking())
            .await
            .map_err(|e| DashcutError::Scan {
                message: format!("scan task failed: {}", e),
            })?
    }
}

/// Parse `2024-03-01_14-05-00-left_repeater.mp4` into its timestamp and camera
pub fn parse_clip_file_name(path: &Path) -> Option<(NaiveDateTime, CameraId)> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case("mp4") {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    if stem.len() <= TIMESTAMP_LEN + 1 || !stem.is_char_boundary(TIMESTAMP_LEN) {
        return None;
    }
    let (stamp, rest) = stem.split_at(TIMESTAMP_LEN);
    let camera = rest.strip_prefix('-')?;

    let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    let camera = camera.parse::<CameraId>().ok()?;
    Some((timestamp, camera))
}

/// Nearest category folder between the file and the scan root; recent
/// recordings when there is none
pub fn classify_source(path: &Path, root: &Path) -> ClipSource {
    path.ancestors()
        .skip(1)
        .take_while(|dir| dir.starts_with(root))
        .filter_map(|dir| dir.file_name()?.to_str())
        .find_map(ClipSource::from_folder_name)
        .unwrap_or(ClipSource::Recent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_parse_clip_file_name() {
        assert_eq!(
            parse_clip_file_name(Path::new("/x/2024-03-01_14-05-00-left_repeater.mp4")),
            Some((at(14, 5, 0), CameraId::LeftRepeater))
        );
        assert_eq!(
            parse_clip_file_name(Path::new("2024-03-01_14-05-00-front.MP4")),
            Some((at(14, 5, 0), CameraId::Front))
        );
        assert_eq!(parse_clip_file_name(Path::new("2024-03-01_14-05-00-front.mov")), None);
        assert_eq!(parse_clip_file_name(Path::new("2024-03-01_14-05-00-dashboard.mp4")), None);
        assert_eq!(parse_clip_file_name(Path::new("2024-13-01_14-05-00-front.mp4")), None);
        assert_eq!(parse_clip_file_name(Path::new("thumb.mp4")), None);
    }

    #[test]
    fn test_classify_source() {
        let root = Path::new("/media/TeslaCam");
        assert_eq!(
            classify_source(Path::new("/media/TeslaCam/SentryClips/2024-03-01_14-05-00/a.mp4"), root),
            ClipSource::Sentry
        );
        assert_eq!(
            classify_source(Path::new("/media/TeslaCam/SavedClips/a.mp4"), root),
            ClipSource::UserSaved
        );
        assert_eq!(
            classify_source(Path::new("/media/TeslaCam/a.mp4"), root),
            ClipSource::Recent
        );
        // Folders above the root do not count
        assert_eq!(
            classify_source(Path::new("/SavedClips/cam/a.mp4"), Path::new("/SavedClips/cam")),
            ClipSource::Recent
        );
    }

    #[tokio::test]
    async fn test_scan_directory_tree() {
        let dir = TempDir::new().unwrap();
        let sentry = dir.path().join("SentryClips").join("2024-03-01_14-05-00");
        std::fs::create_dir_all(&sentry).unwrap();
        std::fs::write(sentry.join("2024-03-01_14-05-00-front.mp4"), vec![0u8; 64]).unwrap();
        std::fs::write(sentry.join("2024-03-01_14-05-00-back.mp4"), vec![0u8; 32]).unwrap();
        std::fs::write(sentry.join("event.json"), b"{}").unwrap();

        let mut files = FsScanner::new(dir.path()).scan().await.unwrap();
        files.sort_by_key(|f| f.camera);

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].camera, CameraId::Front);
        assert_eq!(files[0].size, 64);
        assert_eq!(files[1].camera, CameraId::Back);
        assert!(files.iter().all(|f| f.source == ClipSource::Sentry));
        assert!(files.iter().all(|f| f.timestamp == at(14, 5, 0)));
    }

    #[tokio::test]
    async fn test_scan_missing_root() {
        let err = FsScanner::new("/nonexistent/dashcut-root").scan().await.unwrap_err();
        assert!(matches!(err, DashcutError::Scan { .. }));
    }
}
