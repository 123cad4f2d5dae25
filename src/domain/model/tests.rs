// Unit tests for domain models

use super::*;
use chrono::NaiveDate;

fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn file(camera: CameraId, at: NaiveDateTime, duration: Option<f64>) -> ClipFile {
    let mut f = ClipFile::new(
        format!("/clips/{}-{}.mp4", at.format("%Y-%m-%d_%H-%M-%S"), camera),
        camera,
        at,
        4_000_000,
        ClipSource::Recent,
    );
    f.duration = duration;
    f
}

#[test]
fn test_camera_id_parse_and_display() {
    assert_eq!("front".parse::<CameraId>().unwrap(), CameraId::Front);
    assert_eq!("Left-Repeater".parse::<CameraId>().unwrap(), CameraId::LeftRepeater);
    assert_eq!(CameraId::RightPillar.to_string(), "right_pillar");
    assert!(matches!(
        "roof".parse::<CameraId>(),
        Err(DomainError::UnknownCamera(_))
    ));
}

#[test]
fn test_camera_list_dedupes_and_keeps_order() {
    let cameras = CameraId::parse_list("back, front,back,").unwrap();
    assert_eq!(cameras, vec![CameraId::Back, CameraId::Front]);
    assert!(CameraId::parse_list("front,nope").is_err());
}

#[test]
fn test_mirror_policy() {
    assert!(CameraId::Back.is_mirrored());
    assert!(CameraId::LeftRepeater.is_mirrored());
    assert!(!CameraId::Front.is_mirrored());
    assert!(!CameraId::LeftPillar.is_mirrored());
}

#[test]
fn test_group_uses_fallback_until_measured() {
    let at = ts(10, 0, 0);
    let group = ClipGroup::new(
        at,
        ClipSource::Recent,
        vec![file(CameraId::Front, at, None), file(CameraId::Back, at, None)],
    )
    .unwrap();

    assert_eq!(group.duration(), FALLBACK_CLIP_DURATION_SECS);
    assert!(!group.is_measured());
    assert_eq!(group.end_time(), ts(10, 1, 0));
}

#[test]
fn test_group_duration_is_longest_measured_file() {
    let at = ts(10, 0, 0);
    let group = ClipGroup::new(
        at,
        ClipSource::Recent,
        vec![
            file(CameraId::Front, at, Some(59.2)),
            file(CameraId::Back, at, Some(60.4)),
            file(CameraId::LeftRepeater, at, None),
        ],
    )
    .unwrap();

    assert_eq!(group.duration(), 60.4);
    assert!(group.is_measured());
}

#[test]
fn test_with_measured_duration_returns_new_group() {
    let at = ts(10, 0, 0);
    let group = ClipGroup::new(at, ClipSource::Sentry, vec![file(CameraId::Back, at, None)]).unwrap();

    let refined = group.with_measured_duration(CameraId::Back, 42.5).unwrap();
    assert_eq!(refined.duration(), 42.5);
    assert_eq!(group.duration(), FALLBACK_CLIP_DURATION_SECS);

    assert!(group.with_measured_duration(CameraId::Front, 42.5).is_err());
    assert!(group.with_measured_duration(CameraId::Back, 0.0).is_err());
}

#[test]
fn test_group_rejects_malformed_input() {
    let at = ts(10, 0, 0);
    assert!(matches!(
        ClipGroup::new(at, ClipSource::Recent, vec![]),
        Err(DomainError::MalformedInput(_))
    ));
    assert!(ClipGroup::new(
        at,
        ClipSource::Recent,
        vec![file(CameraId::Front, at, None), file(CameraId::Front, at, None)],
    )
    .is_err());
    assert!(ClipGroup::new(
        at,
        ClipSource::Recent,
        vec![file(CameraId::Front, ts(10, 0, 1), None)],
    )
    .is_err());
}

#[test]
fn test_reference_camera_prefers_front() {
    let at = ts(10, 0, 0);
    let both = ClipGroup::new(
        at,
        ClipSource::Recent,
        vec![file(CameraId::Back, at, None), file(CameraId::Front, at, None)],
    )
    .unwrap();
    assert_eq!(both.reference_camera(), CameraId::Front);

    let no_front = ClipGroup::new(
        at,
        ClipSource::Recent,
        vec![file(CameraId::RightPillar, at, None), file(CameraId::Back, at, None)],
    )
    .unwrap();
    assert_eq!(no_front.reference_camera(), CameraId::Back);
}

#[test]
fn test_time_spec_parse() {
    assert_eq!(TimeSpec::parse("90.5").unwrap().as_seconds(), 90.5);
    assert_eq!(TimeSpec::parse("01:30").unwrap().as_seconds(), 90.0);
    assert_eq!(TimeSpec::parse("1:02:03.5").unwrap().as_seconds(), 3723.5);
    assert!(TimeSpec::parse("-3").is_err());
    assert!(TimeSpec::parse("00:60").is_err());
    assert!(TimeSpec::parse("1:60:00").is_err());
    assert!(TimeSpec::parse("soon").is_err());
}

#[test]
fn test_time_spec_display() {
    assert_eq!(TimeSpec::from_seconds(3723.456).to_string(), "1:02:03.456");
    assert_eq!(TimeSpec::from_seconds(690.0).to_string(), "11:30.000");
}

#[test]
fn test_seconds_between_and_offset() {
    let a = ts(10, 0, 0);
    let b = offset_by_seconds(a, 180.001);
    assert_eq!(seconds_between(a, b), 180.001);
    assert_eq!(seconds_between(b, a), -180.001);
}
