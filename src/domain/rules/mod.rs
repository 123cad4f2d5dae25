// Domain rules - Grouping and filtering of raw camera files

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Files smaller than this are treated as corrupt recordings
pub const MIN_VIABLE_CLIP_BYTES: u64 = 100 * 1024;

/// Outcome of grouping a batch of raw files
#[derive(Debug, Clone, Default)]
pub struct GroupingReport {
    /// Groups that survived filtering, ascending by timestamp
    pub groups: Vec<ClipGroup>,
    /// Files excluded for being under the viable size
    pub corrupt_files: usize,
    /// Timestamps dropped because most of their cameras were corrupt
    pub dropped_groups: Vec<NaiveDateTime>,
}

/// Rules for turning scanned camera files into clip groups
pub struct ClipGrouper {
    min_viable_bytes: u64,
}

impl Default for ClipGrouper {
    fn default() -> Self {
        Self::new(MIN_VIABLE_CLIP_BYTES)
    }
}

impl ClipGrouper {
    pub fn new(min_viable_bytes: u64) -> Self {
        Self { min_viable_bytes }
    }

    /// Group files by exact timestamp.
    ///
    /// A camera that shows up twice for one timestamp keeps its largest file.
    /// Files under the viable size are excluded, and when more than half of a
    /// timestamp's cameras are excluded the whole group is dropped.
    pub fn group(&self, files: Vec<ClipFile>) -> Result<GroupingReport, DomainError> {
        let mut by_timestamp: BTreeMap<NaiveDateTime, BTreeMap<CameraId, ClipFile>> =
            BTreeMap::new();

        for file in files {
            let slot = by_timestamp.entry(file.timestamp).or_default();
            match slot.get(&file.camera) {
                Some(existing) if existing.size >= file.size => {
                    debug!(path = %file.path.display(), "Skipping duplicate camera file");
                }
                _ => {
                    slot.insert(file.camera, file);
                }
            }
        }

        let mut report = GroupingReport::default();
        for (timestamp, cameras) in by_timestamp {
            let seen = cameras.len();
            let (viable, corrupt): (Vec<ClipFile>, Vec<ClipFile>) = cameras
                .into_values()
                .partition(|f| f.size >= self.min_viable_bytes);

            report.corrupt_files += corrupt.len();
            if corrupt.len() * 2 > seen || viable.is_empty() {
                warn!(
                    %timestamp,
                    corrupt = corrupt.len(),
                    cameras = seen,
                    "Dropping clip group with mostly corrupt files"
                );
                report.dropped_groups.push(timestamp);
                continue;
            }

            let source = Self::group_source(&viable);
            report.groups.push(ClipGroup::new(timestamp, source, viable)?);
        }

        Ok(report)
    }

    /// Saved beats sentry beats recent when one timestamp spans folders
    fn group_source(files: &[ClipFile]) -> ClipSource {
        files
            .iter()
            .map(|f| f.source)
            .min()
            .unwrap_or(ClipSource::Recent)
    }
}
