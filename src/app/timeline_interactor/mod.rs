// Timeline interactor - Scans, groups and measures clips into a footage timeline

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::model::*;
use crate::domain::rules::ClipGrouper;
use crate::error::DashcutResult;
use crate::ports::*;
use crate::timeline::{FootageTimeline, GapDetector};

/// Built timeline plus what happened on the way
#[derive(Debug, Clone)]
pub struct TimelineReport {
    pub timeline: FootageTimeline,
    /// Files excluded for being under the viable size
    pub corrupt_files: usize,
    /// Timestamps dropped because most of their cameras were corrupt
    pub dropped_groups: Vec<NaiveDateTime>,
    /// Files whose duration was measured in this run
    pub probed: usize,
    /// Files that could not be measured and kept the fallback duration
    pub probe_failures: usize,
}

/// Interactor for building a footage timeline
pub struct TimelineInteractor {
    scan_port: Arc<dyn ScanPort>,
    probe_port: Option<Arc<dyn ProbePort>>,
    grouper: ClipGrouper,
    detector: GapDetector,
    max_concurrent_probes: usize,
}

impl TimelineInteractor {
    /// Create new timeline interactor with injected ports
    pub fn new(scan_port: Arc<dyn ScanPort>) -> Self {
        Self {
            scan_port,
            probe_port: None,
            grouper: ClipGrouper::default(),
            detector: GapDetector::default(),
            max_concurrent_probes: num_cpus::get().max(1),
        }
    }

    /// Measure real durations with this probe instead of assuming the fallback
    pub fn with_probe(mut self, probe_port: Arc<dyn ProbePort>) -> Self {
        self.probe_port = Some(probe_port);
        self
    }

    pub fn with_gap_threshold(mut self, threshold_secs: f64) -> Self {
        self.detector = GapDetector::new(threshold_secs);
        self
    }

    pub fn with_grouper(mut self, grouper: ClipGrouper) -> Self {
        self.grouper = grouper;
        self
    }

    pub fn with_max_concurrent_probes(mut self, limit: usize) -> Self {
        self.max_concurrent_probes = limit.max(1);
        self
    }

    /// Scan, group, build, then (when a probe is configured) measure and rebuild
    pub async fn build(&self) -> DashcutResult<TimelineReport> {
        let files = self.scan_port.scan().await?;
        debug!(files = files.len(), "Scanned camera files");

        let grouping = self.grouper.group(files)?;
        let timeline = FootageTimeline::with_detector(grouping.groups, self.detector);

        let mut report = TimelineReport {
            timeline,
            corrupt_files: grouping.corrupt_files,
            dropped_groups: grouping.dropped_groups,
            probed: 0,
            probe_failures: 0,
        };

        if let Some(probe_port) = &self.probe_port {
            let (measurements, failures) = self.measure(probe_port, &report.timeline).await;
            report.probed = measurements.len();
            report.probe_failures = failures;
            if !measurements.is_empty() {
                report.timeline = report.timeline.with_measured_durations(&measurements)?;
            }
            info!(
                probed = report.probed,
                failures,
                footage_secs = report.timeline.total_duration(),
                "Applied measured durations"
            );
        }

        Ok(report)
    }

    /// Probe every file without a known duration, at most
    /// `max_concurrent_probes` at a time
    async fn measure(
        &self,
        probe_port: &Arc<dyn ProbePort>,
        timeline: &FootageTimeline,
    ) -> (Vec<(usize, CameraId, f64)>, usize) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_probes));
        let mut tasks = JoinSet::new();

        for (clip_index, group) in timeline.groups().iter().enumerate() {
            for file in group.files().filter(|f| f.duration.is_none()) {
                let probe = Arc::clone(probe_port);
                let semaphore = Arc::clone(&semaphore);
                let camera = file.camera;
                let path: PathBuf = file.path.clone();
                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    let result = probe.probe_duration(&path).await;
                    (clip_index, camera, path, result)
                });
            }
        }

        let mut measurements = Vec::new();
        let mut failures = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((clip_index, camera, _, Ok(seconds))) => measurements.push((clip_index, camera, seconds)),
                Ok((clip_index, camera, path, Err(e))) => {
                    warn!(clip_index, %camera, path = %path.display(), error = %e, "Duration probe failed");
                    failures += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Duration probe task failed");
                    failures += 1;
                }
            }
        }

        // Completion order is arbitrary; keep application deterministic
        measurements.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        (measurements, failures)
    }
}
