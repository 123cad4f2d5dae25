//! dashcut library
//!
//! Gap-aware footage timeline for multi-camera dashcam recordings, plus
//! planning, synthesis and supervised execution of composited exports.
//!
//! Data flows scanner → [`domain::rules::ClipGrouper`] →
//! [`timeline::FootageTimeline`] → [`planner::ExportPlanner`] →
//! [`engine::CommandBuilder`] → [`engine::ExportMonitor`]. Interactive
//! playback drives [`playback::PlaybackController`] from the same timeline.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod planner;
pub mod playback;
pub mod ports;
pub mod timeline;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{CameraId, ClipFile, ClipGroup, ClipSource, TimeSpec};
pub use error::{DashcutError, DashcutResult, ExportError};
pub use planner::{ExportPlan, ExportPlanner, ExportRange};
pub use timeline::{FootagePosition, FootageTimeline, Gap, GapDetector, Segment};
