//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use dashcut::domain::model::{offset_by_seconds, CameraId, ClipFile, ClipGroup, ClipSource};
use dashcut::FootageTimeline;

/// Real seconds with no footage between clip 11 and clip 12
pub const DRIVE_GAP_SECS: f64 = 1379.0;

pub const QUAD: [CameraId; 4] = [
    CameraId::Front,
    CameraId::Back,
    CameraId::LeftRepeater,
    CameraId::RightRepeater,
];

pub fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Capture time of clip `i` in the two-drive fixture
pub fn clip_time(i: usize) -> NaiveDateTime {
    let secs = if i < 12 {
        i as f64 * 60.0
    } else {
        720.0 + DRIVE_GAP_SECS + (i - 12) as f64 * 60.0
    };
    offset_by_seconds(base(), secs)
}

pub fn clip_path(i: usize, camera: CameraId) -> String {
    format!("/TeslaCam/RecentClips/clip{:02}-{}.mp4", i, camera)
}

/// 23 one-minute clips; clips 0-11 and 12-22 are separated by a 1379s hole
/// in real time. `missing(i, camera)` removes a camera file from a clip.
pub fn drive_groups(missing: impl Fn(usize, CameraId) -> bool) -> Vec<ClipGroup> {
    (0..23)
        .map(|i| {
            let files = QUAD
                .into_iter()
                .filter(|&camera| !missing(i, camera))
                .map(|camera| {
                    ClipFile::new(clip_path(i, camera), camera, clip_time(i), 1 << 20, ClipSource::Recent)
                        .with_duration(60.0)
                })
                .collect();
            ClipGroup::new(clip_time(i), ClipSource::Recent, files).unwrap()
        })
        .collect()
}

pub fn drive_timeline() -> FootageTimeline {
    FootageTimeline::new(drive_groups(|_, _| false))
}

/// Same drive with the back camera absent from clips 5-9
pub fn drive_timeline_without_back(from: usize, to: usize) -> FootageTimeline {
    FootageTimeline::new(drive_groups(|i, camera| camera == CameraId::Back && (from..=to).contains(&i)))
}

/// JSON manifest for the drive, without sizes or durations
pub fn drive_manifest() -> String {
    let entries: Vec<serde_json::Value> = (0..23)
        .flat_map(|i| {
            QUAD.into_iter().map(move |camera| {
                serde_json::json!({
                    "path": clip_path(i, camera),
                    "camera": camera,
                    "timestamp": clip_time(i),
                })
            })
        })
        .collect();
    serde_json::to_string_pretty(&entries).unwrap()
}
