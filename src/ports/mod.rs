// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;

use crate::domain::model::*;
use crate::error::DashcutResult;

/// Port for discovering raw camera files
#[async_trait]
pub trait ScanPort: Send + Sync {
    /// Every camera file found, in no particular order
    async fn scan(&self) -> DashcutResult<Vec<ClipFile>>;
}

/// Port for measuring media durations
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Duration of a media file in seconds
    async fn probe_duration(&self, file_path: &Path) -> DashcutResult<f64>;
}

/// Port for the media element that renders the active clip group.
///
/// Commands only; the element reports back by calling the playback
/// controller's `on_*` methods.
pub trait MediaPort {
    /// Load every camera file of a clip group
    fn load(&mut self, group: &ClipGroup);

    fn play(&mut self);

    fn pause(&mut self);

    /// Seek all cameras to an offset within the loaded clip
    fn seek(&mut self, offset_secs: f64);

    fn set_playback_rate(&mut self, multiplier: f64);
}
