//! Export planning and command synthesis on a two-drive timeline

mod common;

use std::collections::BTreeMap;
use std::path::PathBuf;

use common::*;
use dashcut::domain::model::CameraId;
use dashcut::engine::{
    CommandBuilder, ExportOptions, InputSource, QualityTier, TimestampOverlay, TimestampPosition, VideoEncoder,
};
use dashcut::planner::ExportWarning;
use dashcut::{DomainError, ExportPlanner, ExportRange};

fn quad_range(start: f64, end: f64) -> ExportRange {
    ExportRange::new(start, end, QUAD.to_vec())
}

#[test]
fn test_range_across_the_gap_is_one_continuous_export() {
    let timeline = drive_timeline();
    let plan = ExportPlanner::new().plan(&timeline, &quad_range(600.0, 750.0)).unwrap();

    assert_eq!(plan.duration(), 150.0);
    assert!(plan.warnings.is_empty());
    assert!(plan.omitted.is_empty());
    assert_eq!(plan.cameras.len(), 4);
    for camera_plan in &plan.cameras {
        let clips: Vec<usize> = camera_plan.slices.iter().map(|s| s.clip_index).collect();
        assert_eq!(clips, vec![10, 11, 12]);
        assert_eq!(camera_plan.duration(), 150.0);
    }

    // Known to the caller, but no reason to refuse
    assert_eq!(plan.crossed_gaps.len(), 1);
    assert_eq!(plan.runs.len(), 2);
    assert_eq!(plan.runs[1].output_start, 120.0);
    assert_eq!(plan.runs[1].real_start, clip_time(12));
}

#[test]
fn test_camera_hole_only_affects_that_camera() {
    let timeline = drive_timeline_without_back(5, 9);
    let start = timeline.clip_start(3);
    let end = timeline.clip_start(13);
    let plan = ExportPlanner::new().plan(&timeline, &quad_range(start, end)).unwrap();

    let back: Vec<usize> = plan
        .camera(CameraId::Back)
        .unwrap()
        .slices
        .iter()
        .map(|s| s.clip_index)
        .collect();
    assert_eq!(back, vec![3, 4, 10, 11, 12]);

    let front: Vec<usize> = plan
        .camera(CameraId::Front)
        .unwrap()
        .slices
        .iter()
        .map(|s| s.clip_index)
        .collect();
    assert_eq!(front, (3..=12).collect::<Vec<_>>());

    assert_eq!(
        plan.warnings,
        vec![ExportWarning::PartialCoverage {
            camera: CameraId::Back,
            missing_clips: vec![5, 6, 7, 8, 9],
        }]
    );
}

#[test]
fn test_invalid_ranges() {
    let timeline = drive_timeline();
    let planner = ExportPlanner::new();

    for (start, end) in [(100.0, 100.0), (200.0, 100.0), (-1.0, 10.0), (0.0, 1380.5), (f64::NAN, 10.0)] {
        let err = planner.plan(&timeline, &quad_range(start, end)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidRange { .. }), "{start}..{end}: {err:?}");
    }

    let err = planner
        .plan(&timeline, &ExportRange::new(0.0, 10.0, vec![CameraId::LeftPillar]))
        .unwrap_err();
    assert!(matches!(err, DomainError::EmptyExport { .. }));
}

#[test]
fn test_quad_command_across_the_gap() {
    let timeline = drive_timeline();
    let plan = ExportPlanner::new().plan(&timeline, &quad_range(600.0, 750.0)).unwrap();

    let options = ExportOptions::new("/exports/drive.mp4")
        .with_timestamp(Some(TimestampOverlay::new(TimestampPosition::BottomCenter)));
    let spec = CommandBuilder::new(options, VideoEncoder::Libx264).build(&plan).unwrap();

    assert_eq!((spec.width, spec.height), (2560, 1920));
    assert_eq!(spec.duration, 150.0);
    assert_eq!(spec.concat_inputs().count(), 4);

    let back = &spec.inputs[1];
    assert_eq!(back.camera, CameraId::Back);
    assert_eq!(back.seek, 1.0);
    assert_eq!(
        back.source,
        InputSource::Concat(vec![
            PathBuf::from(clip_path(10, CameraId::Back)),
            PathBuf::from(clip_path(11, CameraId::Back)),
            PathBuf::from(clip_path(12, CameraId::Back)),
        ])
    );
    assert_eq!(spec.inputs[0].seek, 0.0);

    let graph = &spec.filter_graph;
    assert!(graph.contains("[0:v]setpts=PTS-STARTPTS,scale=1280:960[c0]"));
    assert!(graph.contains("[1:v]setpts=PTS-STARTPTS,hflip,scale=1280:960[c1]"));
    assert!(graph.contains("[c0][c1][c2][c3]xstack=inputs=4:layout=0_0|1280_0|0_960|1280_960:fill=black[grid]"));
    assert_eq!(graph.matches("drawtext=").count(), 2);
    assert!(graph.contains("enable='gte(t,0.000)*lt(t,120.000)'"));
    assert!(graph.contains("enable='between(t,120.000,150.000)'"));
    assert!(graph.ends_with("format=yuv420p[vout]"));

    let lists: BTreeMap<usize, PathBuf> = (0..4).map(|i| (i, PathBuf::from(format!("/tmp/list{}.txt", i)))).collect();
    let args = spec.args(&lists);
    let joined = args.join(" ");
    assert!(joined.contains("-f concat -safe 0 -ss 1.000 -t 150.000 -i /tmp/list1.txt"));
    assert!(joined.contains("-map [vout] -an -c:v libx264"));
    assert!(joined.ends_with("-t 150.000 -movflags +faststart /exports/drive.mp4"));
}

#[test]
fn test_single_camera_mobile_export_with_audio() {
    let timeline = drive_timeline();
    let plan = ExportPlanner::new()
        .plan(&timeline, &ExportRange::new(75.0, 100.0, vec![CameraId::Front]))
        .unwrap();

    let options = ExportOptions::new("/exports/front.mp4")
        .with_quality(QualityTier::Mobile)
        .with_audio(true);
    let spec = CommandBuilder::new(options, VideoEncoder::Nvenc).build(&plan).unwrap();

    assert_eq!(spec.inputs.len(), 1);
    assert_eq!(spec.inputs[0].source, InputSource::File(PathBuf::from(clip_path(1, CameraId::Front))));
    assert_eq!(spec.inputs[0].seek, 15.0);
    assert_eq!(spec.inputs[0].duration, 25.0);
    assert_eq!((spec.width, spec.height), (1440, 1080));
    assert!(!spec.filter_graph.contains("xstack"));
    assert!(spec.filter_graph.contains("[c0]scale=1440:1080,format=yuv420p[vout]"));
    assert_eq!(spec.audio_input, Some(0));

    let args = spec.preview_args().join(" ");
    assert!(args.contains("-map 0:a? -c:a aac -b:a 128k"));
    assert!(args.contains("-c:v h264_nvenc"));
}

#[test]
fn test_back_camera_slice_at_the_end_of_a_clip_stays_inside_the_file() {
    let timeline = drive_timeline();
    let plan = ExportPlanner::new()
        .plan(&timeline, &ExportRange::new(119.5, 120.0, vec![CameraId::Front, CameraId::Back]))
        .unwrap();

    let spec = CommandBuilder::new(ExportOptions::new("/exports/tail.mp4"), VideoEncoder::Libx264)
        .build(&plan)
        .unwrap();

    let back = &spec.inputs[1];
    assert_eq!(back.camera, CameraId::Back);
    assert_eq!(back.source, InputSource::File(PathBuf::from(clip_path(1, CameraId::Back))));
    assert!(back.seek < 60.0, "seek {} is past the end of the file", back.seek);
    assert_eq!(back.seek, 59.5);
    assert_eq!(spec.inputs[0].seek, 59.5);
    assert_eq!(spec.duration, 0.5);
}
