//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::toml_config::{Settings, TomlConfigAdapter};
use crate::adapters::{FfprobeAdapter, FsScanner, ManifestScanner};
use crate::app::{ExportInteractor, ExportRequest, TimelineInteractor, TimelineReport};
use crate::cli::args::{ConfigArgs, ExportArgs, LocateArgs, SourceArgs, TimelineArgs};
use crate::domain::model::{CameraId, ClipSource, TimeSpec};
use crate::engine::progress::{ConsoleProgressCallback, JsonProgressCallback};
use crate::engine::{CancelHandle, ExportOptions, ProgressCallback, TimestampOverlay};
use crate::planner::{ExportRange, ExportWarning};
use crate::ports::ScanPort;
use crate::timeline::{FootagePosition, FootageTimeline, Gap, Segment};
use crate::utils::time::format_duration;

/// Scan (or read the manifest), group, and optionally probe
async fn load_timeline(source: &SourceArgs, settings: &Settings) -> Result<TimelineReport> {
    let scan_port: Arc<dyn ScanPort> = match (&source.root, &source.manifest) {
        (_, Some(manifest)) => Arc::new(ManifestScanner::new(manifest)),
        (Some(root), None) => Arc::new(FsScanner::new(root)),
        (None, None) => anyhow::bail!("either --root or --manifest is required"),
    };

    let mut interactor = TimelineInteractor::new(scan_port).with_gap_threshold(settings.gap_threshold_secs);
    if source.probe {
        interactor = interactor.with_probe(Arc::new(FfprobeAdapter::new(&settings.ffprobe_path)));
    }

    let report = interactor.build().await.context("Failed to build footage timeline")?;
    if report.corrupt_files > 0 {
        warn!(
            corrupt_files = report.corrupt_files,
            dropped_groups = report.dropped_groups.len(),
            "Skipped undersized camera files"
        );
    }
    Ok(report)
}

#[derive(Serialize)]
struct ClipSummary {
    index: usize,
    timestamp: NaiveDateTime,
    source: ClipSource,
    /// Footage time at which the clip starts
    footage_start: f64,
    duration: f64,
    measured: bool,
    cameras: Vec<CameraId>,
}

#[derive(Serialize)]
struct TimelineSummary<'a> {
    total_duration: f64,
    gap_threshold: f64,
    clips: Vec<ClipSummary>,
    segments: &'a [Segment],
    gaps: &'a [Gap],
    corrupt_files: usize,
    dropped_groups: &'a [NaiveDateTime],
}

impl<'a> TimelineSummary<'a> {
    fn new(report: &'a TimelineReport) -> Self {
        let timeline = &report.timeline;
        let clips = timeline
            .groups()
            .iter()
            .enumerate()
            .map(|(index, group)| ClipSummary {
                index,
                timestamp: group.timestamp(),
                source: group.source(),
                footage_start: timeline.clip_start(index),
                duration: group.duration(),
                measured: group.is_measured(),
                cameras: group.cameras().collect(),
            })
            .collect();

        Self {
            total_duration: timeline.total_duration(),
            gap_threshold: timeline.gap_threshold(),
            clips,
            segments: timeline.segments(),
            gaps: timeline.gaps(),
            corrupt_files: report.corrupt_files,
            dropped_groups: &report.dropped_groups,
        }
    }
}

fn hms(seconds: f64) -> String {
    TimeSpec::from_seconds(seconds).format_hms()
}

/// Execute the timeline command
pub async fn timeline(args: TimelineArgs, settings: &Settings) -> Result<()> {
    let report = load_timeline(&args.source, settings).await?;
    let summary = TimelineSummary::new(&report);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Clips: {}  Segments: {}  Gaps: {}",
        summary.clips.len(),
        summary.segments.len(),
        summary.gaps.len()
    );
    println!("Footage: {}", hms(summary.total_duration));
    if summary.corrupt_files > 0 {
        println!(
            "Skipped: {} undersized files, {} clip groups",
            summary.corrupt_files,
            summary.dropped_groups.len()
        );
    }
    println!();

    for (number, segment) in summary.segments.iter().enumerate() {
        let first = &summary.clips[segment.start_index];
        println!(
            "Segment {}: clips {}-{} ({} clips, {}) from {}",
            number + 1,
            segment.start_index,
            segment.end_index,
            segment.clip_count(),
            hms(segment.duration),
            first.timestamp
        );
        if let Some(gap) = summary.gaps.iter().find(|g| g.before_index == segment.end_index) {
            println!("  Gap: {} -> {} ({} without footage)", gap.start, gap.end, hms(gap.duration));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct LocateSummary {
    footage_time: f64,
    percent: f64,
    clip_index: usize,
    offset: f64,
    real_time: Option<NaiveDateTime>,
    segment: Option<usize>,
}

fn locate_summary(timeline: &FootageTimeline, position: FootagePosition) -> LocateSummary {
    let segment = timeline
        .segments()
        .iter()
        .position(|segment| segment.contains(position.clip_index));
    LocateSummary {
        footage_time: timeline.footage_position_of(position.clip_index, position.offset),
        percent: timeline.percent_of(position),
        clip_index: position.clip_index,
        offset: position.offset,
        real_time: timeline.real_time_at(position),
        segment,
    }
}

/// Execute the locate command
pub async fn locate(args: LocateArgs, settings: &Settings) -> Result<()> {
    let report = load_timeline(&args.source, settings).await?;
    let timeline = &report.timeline;

    let position = match (args.percent, args.at) {
        (Some(percent), _) => timeline.resolve_percent(percent),
        (None, Some(at)) => timeline.resolve_footage_time(at),
        (None, None) => anyhow::bail!("either --percent or --at is required"),
    }
    .context("Timeline has no footage")?;

    let summary = locate_summary(timeline, position);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Clip: {} at {:.3}s", summary.clip_index, summary.offset);
    println!("Footage: {} ({:.2}%)", hms(summary.footage_time), summary.percent);
    if let Some(real_time) = summary.real_time {
        println!("Recorded: {}", real_time);
    }
    if let Some(segment) = summary.segment {
        println!("Segment: {}", segment + 1);
    }
    Ok(())
}

/// Execute the export command
pub async fn export(args: ExportArgs, settings: &Settings) -> Result<()> {
    let report = load_timeline(&args.source, settings).await?;

    let cameras = if args.cameras.is_empty() {
        CameraId::ALL.to_vec()
    } else {
        args.cameras.clone()
    };
    let timestamp = settings.export.timestamp.then(|| {
        TimestampOverlay::new(settings.export.timestamp_position)
            .with_font_file(settings.export.font_file.clone())
    });
    let request = ExportRequest {
        range: ExportRange::new(args.start, args.end, cameras),
        options: ExportOptions::new(&args.output)
            .with_quality(settings.export.quality)
            .with_timestamp(timestamp)
            .with_audio(settings.export.include_audio),
        hardware_acceleration: settings.export.hardware_acceleration,
        dry_run: args.dry_run,
    };

    let callbacks: Vec<Arc<dyn ProgressCallback>> = if args.json {
        vec![Arc::new(JsonProgressCallback::new(true))]
    } else {
        vec![Arc::new(ConsoleProgressCallback::new(false))]
    };

    let cancel = CancelHandle::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, cancelling export");
                cancel.cancel();
            }
        })
    };

    let interactor = ExportInteractor::new(settings.monitor_config());
    let result = interactor
        .execute(&report.timeline, &request, &callbacks, &cancel)
        .await;
    ctrl_c.abort();
    let response = result.context("Export failed")?;

    if args.json {
        let summary = serde_json::json!({
            "dry_run": args.dry_run,
            "output": response.output,
            "command_line": response.command_line,
            "plan": response.plan,
            "command": response.command,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let plan = &response.plan;
    println!(
        "Range: {} - {} ({})",
        hms(plan.range.start),
        hms(plan.range.end),
        hms(plan.duration())
    );
    let included: Vec<&str> = plan.cameras.iter().map(|c| c.camera.as_str()).collect();
    println!("Cameras: {}", included.join(", "));
    if !plan.omitted.is_empty() {
        let omitted: Vec<&str> = plan.omitted.iter().map(CameraId::as_str).collect();
        println!("Omitted (no footage): {}", omitted.join(", "));
    }
    for gap in &plan.crossed_gaps {
        println!("Crosses gap: {} -> {} ({})", gap.start, gap.end, hms(gap.duration));
    }
    for warning in &plan.warnings {
        match warning {
            ExportWarning::PartialCoverage { camera, missing_clips } => {
                println!("Warning: {} is missing {} clip(s) in range", camera, missing_clips.len());
            }
        }
    }

    match &response.output {
        Some(output) => println!(
            "Wrote {} in {}",
            output.display(),
            format_duration(response.processing_time)
        ),
        None => println!("{}", response.command_line),
    }
    Ok(())
}

/// Execute the config command
pub fn config(args: ConfigArgs, settings: &Settings) -> Result<()> {
    let shown = if args.defaults {
        Settings::default()
    } else {
        settings.clone()
    };
    print!("{}", TomlConfigAdapter::to_toml(&shown)?);
    Ok(())
}
