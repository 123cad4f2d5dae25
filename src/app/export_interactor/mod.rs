// Export interactor - Orchestrates planning, command building and execution

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::domain::model::CameraId;
use crate::engine::{
    CancelHandle, CommandBuilder, CommandSpec, ExportMonitor, ExportOptions, HardwareAcceleration,
    MonitorConfig, ProgressCallback, ProgressTracker, VideoEncoder,
};
use crate::error::DashcutResult;
use crate::planner::{ExportPlan, ExportPlanner, ExportRange, ExportWarning};
use crate::timeline::FootageTimeline;

/// Export request in footage time
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub range: ExportRange,
    pub options: ExportOptions,
    pub hardware_acceleration: HardwareAcceleration,
    /// Plan and build only; nothing is written or spawned
    pub dry_run: bool,
}

/// Export response
#[derive(Debug, Clone)]
pub struct ExportResponse {
    pub plan: ExportPlan,
    pub command: CommandSpec,
    /// Printable transcoder invocation
    pub command_line: String,
    /// Written file; `None` for a dry run
    pub output: Option<PathBuf>,
    pub processing_time: Duration,
}

/// Interactor for the export use case
pub struct ExportInteractor {
    planner: ExportPlanner,
    monitor: ExportMonitor,
}

impl ExportInteractor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            planner: ExportPlanner::new(),
            monitor: ExportMonitor::new(config),
        }
    }

    /// Plan the range and synthesize the command for a known encoder
    pub fn prepare(
        &self,
        timeline: &FootageTimeline,
        request: &ExportRequest,
        encoder: VideoEncoder,
    ) -> DashcutResult<(ExportPlan, CommandSpec)> {
        let plan = self.planner.plan(timeline, &request.range)?;
        for warning in &plan.warnings {
            match warning {
                ExportWarning::PartialCoverage { camera, missing_clips } => {
                    warn!(%camera, missing = ?missing_clips, "Camera has holes in the export range");
                }
            }
        }
        if !plan.omitted.is_empty() {
            let omitted: Vec<&str> = plan.omitted.iter().map(CameraId::as_str).collect();
            warn!(?omitted, "Cameras without footage in range left out");
        }

        let command = CommandBuilder::new(request.options.clone(), encoder).build(&plan)?;
        Ok((plan, command))
    }

    /// Plan, build and (unless dry-running) run an export
    pub async fn execute(
        &self,
        timeline: &FootageTimeline,
        request: &ExportRequest,
        callbacks: &[Arc<dyn ProgressCallback>],
        cancel: &CancelHandle,
    ) -> DashcutResult<ExportResponse> {
        let started = Instant::now();
        let ffmpeg_path = &self.monitor.config().ffmpeg_path;
        let encoder = request.hardware_acceleration.resolve(ffmpeg_path).await;

        let (plan, command) = self.prepare(timeline, request, encoder)?;
        let command_line = command.command_line(ffmpeg_path);
        info!(
            start = plan.range.start,
            end = plan.range.end,
            cameras = plan.cameras.len(),
            crossed_gaps = plan.crossed_gaps.len(),
            encoder = encoder.codec_name(),
            "Export planned"
        );

        if request.dry_run {
            return Ok(ExportResponse {
                plan,
                command,
                command_line,
                output: None,
                processing_time: started.elapsed(),
            });
        }

        if let Some(parent) = command.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tracker = ProgressTracker::new(command.duration);
        for callback in callbacks {
            tracker.add_callback(Arc::clone(callback));
        }
        let output = self.monitor.execute(&command, &tracker, cancel).await?;

        Ok(ExportResponse {
            plan,
            command,
            command_line,
            output: Some(output),
            processing_time: started.elapsed(),
        })
    }
}
