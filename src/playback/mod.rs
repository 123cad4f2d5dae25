//! Playback position controller
//!
//! Owns the active clip index and in-clip offset for a loaded timeline and
//! drives a [`MediaPort`]. Media events come back through the `on_*` methods.
//! Only the clip group's reference camera moves the position; the other
//! cameras count towards "all cameras ended" and nothing else.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::CameraId;
use crate::ports::MediaPort;
use crate::timeline::{FootagePosition, FootageTimeline};

/// A time update this close to a pending seek target confirms the seek
pub const SEEK_SETTLE_TOLERANCE_SECS: f64 = 1.0;

/// Controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    /// No timeline loaded
    Idle,
    /// Timeline loaded, playback not started yet
    Loaded,
    Playing,
    Paused,
    /// Seek in flight; stale time updates are ignored
    Seeking,
    /// Moving to a neighbouring clip; further "ended" signals are ignored
    Advancing,
}

/// Notifications for the surrounding application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlaybackEvent {
    /// A different clip group became active
    ClipChanged { clip_index: usize },
    /// Playback moved across missing footage. Purely informational.
    GapCrossed {
        start: NaiveDateTime,
        end: NaiveDateTime,
        duration: f64,
    },
    /// The media element measured a camera file
    DurationMeasured {
        clip_index: usize,
        camera: CameraId,
        duration: f64,
    },
    /// The last clip finished
    EndOfTimeline,
    MediaError { camera: CameraId, reason: String },
}

/// Why the active clip is changing
#[derive(Debug, Clone, Copy)]
enum Switch {
    Seek,
    Advance { resume: bool },
}

/// Clip load waiting for the reference camera's metadata
#[derive(Debug, Clone, Copy)]
struct PendingLoad {
    /// Offset to apply once loaded
    offset: f64,
    /// First load after a timeline was installed
    initial: bool,
}

/// Stateful owner of the playback position
pub struct PlaybackController<M: MediaPort> {
    media: M,
    timeline: Option<FootageTimeline>,
    clip_index: usize,
    offset: f64,
    state: PlaybackState,
    /// Play once the current seek or advance settles
    resume: bool,
    loading: Option<PendingLoad>,
    seek_target: Option<f64>,
    ended_cameras: BTreeSet<CameraId>,
    playback_rate: f64,
    events: Vec<PlaybackEvent>,
}

impl<M: MediaPort> PlaybackController<M> {
    pub fn new(media: M) -> Self {
        Self {
            media,
            timeline: None,
            clip_index: 0,
            offset: 0.0,
            state: PlaybackState::Idle,
            resume: false,
            loading: None,
            seek_target: None,
            ended_cameras: BTreeSet::new(),
            playback_rate: 1.0,
            events: Vec::new(),
        }
    }

    /// Replace the active timeline and start over at clip 0
    pub fn load_timeline(&mut self, timeline: FootageTimeline) {
        self.clip_index = 0;
        self.offset = 0.0;
        self.resume = false;
        self.loading = None;
        self.seek_target = None;
        self.ended_cameras.clear();

        if timeline.is_empty() {
            info!("Empty timeline loaded, controller idle");
            self.timeline = None;
            self.state = PlaybackState::Idle;
            return;
        }

        info!(clips = timeline.len(), "Timeline loaded");
        self.timeline = Some(timeline);
        self.state = PlaybackState::Loaded;
        self.loading = Some(PendingLoad { offset: 0.0, initial: true });
        self.load_current();
        self.events.push(PlaybackEvent::ClipChanged { clip_index: 0 });
    }

    /// Swap in a rebuilt timeline over the same clips (e.g. after durations
    /// were measured) keeping the active clip. A timeline with a different
    /// clip count is loaded from scratch instead.
    pub fn refresh_timeline(&mut self, timeline: FootageTimeline) {
        let same_clips = self
            .timeline
            .as_ref()
            .map_or(false, |current| current.len() == timeline.len());
        if !same_clips {
            self.load_timeline(timeline);
            return;
        }

        if let Some(group) = timeline.group(self.clip_index) {
            self.offset = self.offset.min(group.duration());
        }
        debug!(clip = self.clip_index, "Timeline refreshed in place");
        self.timeline = Some(timeline);
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn timeline(&self) -> Option<&FootageTimeline> {
        self.timeline.as_ref()
    }

    pub fn clip_index(&self) -> usize {
        self.clip_index
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn playback_rate(&self) -> f64 {
        self.playback_rate
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// Current position, if a timeline is loaded
    pub fn position(&self) -> Option<FootagePosition> {
        self.timeline
            .as_ref()
            .map(|_| FootagePosition::new(self.clip_index, self.offset))
    }

    /// Current footage time in seconds
    pub fn footage_time(&self) -> f64 {
        self.timeline
            .as_ref()
            .map_or(0.0, |t| t.footage_position_of(self.clip_index, self.offset))
    }

    /// Current scrubber percentage
    pub fn footage_percent(&self) -> f64 {
        match (&self.timeline, self.position()) {
            (Some(timeline), Some(position)) => timeline.percent_of(position),
            _ => 0.0,
        }
    }

    /// Drain pending notifications
    pub fn take_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Idle => {}
            PlaybackState::Seeking | PlaybackState::Advancing => self.resume = true,
            PlaybackState::Loaded | PlaybackState::Paused | PlaybackState::Playing => {
                self.resume = true;
                self.state = PlaybackState::Playing;
                self.media.play();
            }
        }
    }

    pub fn pause(&mut self) {
        match self.state {
            PlaybackState::Idle => {}
            PlaybackState::Seeking | PlaybackState::Advancing => self.resume = false,
            PlaybackState::Loaded | PlaybackState::Paused | PlaybackState::Playing => {
                self.resume = false;
                self.state = PlaybackState::Paused;
                self.media.pause();
            }
        }
    }

    pub fn set_playback_rate(&mut self, multiplier: f64) -> Result<(), DomainError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(DomainError::BadArgs(format!(
                "playback rate must be positive, got {}",
                multiplier
            )));
        }
        self.playback_rate = multiplier;
        self.media.set_playback_rate(multiplier);
        Ok(())
    }

    /// Seek to a scrubber percentage (0-100, gaps excluded)
    pub fn seek(&mut self, footage_percent: f64) -> Option<FootagePosition> {
        let total = self.timeline.as_ref()?.total_duration();
        let percent = if footage_percent.is_nan() { 0.0 } else { footage_percent.clamp(0.0, 100.0) };
        self.seek_footage_time(percent / 100.0 * total)
    }

    /// Seek to a footage time. A newer seek supersedes one still in flight.
    pub fn seek_footage_time(&mut self, footage_time: f64) -> Option<FootagePosition> {
        let target = self.timeline.as_ref()?.resolve_footage_time(footage_time)?;
        let resume = self.wants_playback();
        debug!(
            clip = target.clip_index,
            offset = target.offset,
            footage_time,
            "Seeking"
        );

        if target.clip_index != self.clip_index {
            self.switch_clip(target.clip_index, target.offset, Switch::Seek);
        } else if let Some(pending) = self.loading.as_mut() {
            // Same clip still loading; apply the newest offset once it is ready
            pending.offset = target.offset;
            self.offset = target.offset;
        } else {
            self.offset = target.offset;
            self.seek_target = Some(target.offset);
            self.ended_cameras.clear();
            self.media.seek(target.offset);
        }

        self.resume = resume;
        self.state = PlaybackState::Seeking;
        Some(target)
    }

    /// The active clip finished playing.
    ///
    /// Ignored while an advance, a seek or a clip load is underway, so
    /// duplicate or stale "ended" signals move at most one clip and never
    /// override a seek. Returns true when a new clip was loaded.
    pub fn on_clip_playback_ended(&mut self) -> bool {
        if self.transition_in_flight() {
            debug!(clip = self.clip_index, state = ?self.state, "Ignoring ended signal during transition");
            return false;
        }
        let Some(last) = self.timeline.as_ref().map(|t| t.len() - 1) else {
            return false;
        };

        if self.clip_index >= last {
            if let Some(group) = self.timeline.as_ref().and_then(|t| t.group(last)) {
                self.offset = group.duration();
            }
            self.resume = false;
            self.seek_target = None;
            self.state = PlaybackState::Paused;
            self.media.pause();
            info!("Reached end of footage");
            self.events.push(PlaybackEvent::EndOfTimeline);
            return false;
        }

        let resume = self.wants_playback();
        self.switch_clip(self.clip_index + 1, 0.0, Switch::Advance { resume });
        true
    }

    /// User asked for the next clip. Not subject to the ended-signal guard.
    pub fn manual_advance(&mut self) -> bool {
        let Some(last) = self.timeline.as_ref().map(|t| t.len() - 1) else {
            return false;
        };
        if self.clip_index >= last {
            return false;
        }
        let resume = self.wants_playback();
        self.switch_clip(self.clip_index + 1, 0.0, Switch::Advance { resume });
        true
    }

    /// User asked for the previous clip; on the first clip this rewinds it
    pub fn manual_retreat(&mut self) -> bool {
        if self.timeline.is_none() {
            return false;
        }
        if self.clip_index == 0 {
            self.seek_footage_time(0.0);
            return false;
        }
        let resume = self.wants_playback();
        self.switch_clip(self.clip_index - 1, 0.0, Switch::Advance { resume });
        true
    }

    /// Media element finished loading a camera file
    pub fn on_metadata_loaded(&mut self, camera: CameraId, duration_secs: f64) {
        if duration_secs.is_finite() && duration_secs > 0.0 {
            self.events.push(PlaybackEvent::DurationMeasured {
                clip_index: self.clip_index,
                camera,
                duration: duration_secs,
            });
        }
        if Some(camera) != self.reference_camera() {
            return;
        }
        let Some(pending) = self.loading.take() else {
            return;
        };

        if pending.offset > 0.0 {
            self.offset = pending.offset;
            self.seek_target = Some(pending.offset);
            self.media.seek(pending.offset);
            self.state = PlaybackState::Seeking;
        } else if pending.initial && !self.resume {
            self.state = PlaybackState::Loaded;
        } else {
            self.settle();
        }
    }

    /// Media element reported its current time
    pub fn on_time_updated(&mut self, camera: CameraId, current_secs: f64) {
        if Some(camera) != self.reference_camera() || self.loading.is_some() {
            return;
        }
        let Some(duration) = self.current_duration() else {
            return;
        };
        let current = current_secs.clamp(0.0, duration);

        if let Some(target) = self.seek_target {
            if (current - target).abs() <= SEEK_SETTLE_TOLERANCE_SECS {
                self.offset = current;
                self.settle();
            } else {
                debug!(current, target, "Ignoring stale time update during seek");
            }
            return;
        }

        // The displayed position never moves backwards during playback
        if current > self.offset {
            self.offset = current;
        }
    }

    /// A camera's media element reached the end of its file
    pub fn on_camera_ended(&mut self, camera: CameraId) -> bool {
        if self.transition_in_flight() {
            return false;
        }
        self.ended_cameras.insert(camera);

        let all_ended = self
            .timeline
            .as_ref()
            .and_then(|t| t.group(self.clip_index))
            .map_or(false, |g| g.cameras().all(|c| self.ended_cameras.contains(&c)));

        if Some(camera) == self.reference_camera() || all_ended {
            self.on_clip_playback_ended()
        } else {
            false
        }
    }

    /// Media element failed
    pub fn on_media_error(&mut self, camera: CameraId, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%camera, %reason, "Media error");
        if Some(camera) == self.reference_camera() && self.state != PlaybackState::Idle {
            self.loading = None;
            self.seek_target = None;
            self.resume = false;
            self.state = PlaybackState::Paused;
            self.media.pause();
        }
        self.events.push(PlaybackEvent::MediaError { camera, reason });
    }

    fn reference_camera(&self) -> Option<CameraId> {
        self.timeline
            .as_ref()?
            .group(self.clip_index)
            .map(|g| g.reference_camera())
    }

    fn current_duration(&self) -> Option<f64> {
        self.timeline
            .as_ref()?
            .group(self.clip_index)
            .map(|g| g.duration())
    }

    /// Seek, advance or clip load not yet confirmed by the media element
    fn transition_in_flight(&self) -> bool {
        matches!(self.state, PlaybackState::Seeking | PlaybackState::Advancing)
            || self.loading.is_some()
            || self.seek_target.is_some()
    }

    fn wants_playback(&self) -> bool {
        match self.state {
            PlaybackState::Playing => true,
            PlaybackState::Seeking | PlaybackState::Advancing => self.resume,
            _ => false,
        }
    }

    /// Finish a seek or advance
    fn settle(&mut self) {
        self.seek_target = None;
        if self.resume {
            self.state = PlaybackState::Playing;
            self.media.play();
        } else {
            self.state = PlaybackState::Paused;
        }
    }

    /// Make another clip active. Only a step from a clip straight to the
    /// next one reports a crossed gap.
    fn switch_clip(&mut self, clip_index: usize, offset: f64, switch: Switch) {
        if matches!(switch, Switch::Advance { .. }) && clip_index == self.clip_index + 1 {
            if let Some(gap) = self.timeline.as_ref().and_then(|t| t.gap_after(self.clip_index)) {
                info!(seconds = gap.duration, "Crossing gap in footage");
                self.events.push(PlaybackEvent::GapCrossed {
                    start: gap.start,
                    end: gap.end,
                    duration: gap.duration,
                });
            }
        }

        self.clip_index = clip_index;
        self.offset = offset;
        self.seek_target = None;
        self.ended_cameras.clear();
        self.loading = Some(PendingLoad { offset, initial: false });
        if let Switch::Advance { resume } = switch {
            self.resume = resume;
            self.state = PlaybackState::Advancing;
        }
        self.load_current();
        self.events.push(PlaybackEvent::ClipChanged { clip_index });
    }

    fn load_current(&mut self) {
        if let Some(group) = self.timeline.as_ref().and_then(|t| t.group(self.clip_index)) {
            self.media.load(group);
        }
    }
}
