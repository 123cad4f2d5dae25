//! Progress tracking and callback system for export runs

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Highest percentage reported before the transcoder has exited cleanly
pub const MAX_RUNNING_PERCENT: f64 = 99.9;

/// Progress callback trait for UI integration
pub trait ProgressCallback: Send + Sync {
    /// Called when the transcoder starts
    fn on_start(&self, operation: &str, total_secs: f64);

    /// Called on every progress update
    fn on_progress(&self, progress: &ExportProgress);

    /// Called when the transcoder exits cleanly
    fn on_complete(&self, message: Option<String>);

    /// Called when the export fails
    fn on_error(&self, error: &str);

    /// Called when the export is cancelled
    fn on_cancel(&self);

    /// Check if the export should be cancelled
    fn should_cancel(&self) -> bool {
        false
    }
}

/// Snapshot of a running export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub phase: ProgressPhase,
    /// 0.0 - 100.0; stays below 100 until the transcoder exits
    pub percent: f64,
    /// Output seconds written so far
    pub processed_secs: f64,
    /// Planned output length
    pub total_secs: f64,
    /// Time elapsed since start
    pub elapsed: Duration,
    /// Estimated time remaining
    pub eta: Option<Duration>,
    /// True when the figure comes from the wall-clock fallback rather than
    /// the transcoder's own time markers
    pub estimated: bool,
}

/// Progress phases
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProgressPhase {
    Initializing,
    Encoding,
    Complete,
    Failed,
    Cancelled,
}

impl ExportProgress {
    fn new(total_secs: f64) -> Self {
        Self {
            phase: ProgressPhase::Initializing,
            percent: 0.0,
            processed_secs: 0.0,
            total_secs,
            elapsed: Duration::ZERO,
            eta: None,
            estimated: false,
        }
    }
}

/// Progress tracker with thread-safe updates.
///
/// Percentages never move backwards and nothing reaches the callbacks once
/// the export has completed, failed or been cancelled.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<ProgressTrackerInner>>,
    callbacks: Arc<Mutex<Vec<Arc<dyn ProgressCallback>>>>,
}

struct ProgressTrackerInner {
    progress: ExportProgress,
    start_time: Instant,
    last_update: Option<Instant>,
    update_interval: Duration,
    cancelled: bool,
    finished: bool,
}

impl ProgressTracker {
    /// Create a tracker for an output of `total_secs`
    pub fn new(total_secs: f64) -> Self {
        let inner = ProgressTrackerInner {
            progress: ExportProgress::new(total_secs),
            start_time: Instant::now(),
            last_update: None,
            update_interval: Duration::from_millis(100),
            cancelled: false,
            finished: false,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a progress callback
    pub fn add_callback(&self, callback: Arc<dyn ProgressCallback>) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.push(callback);
        }
    }

    /// Set the minimum spacing between progress notifications
    pub fn set_update_interval(&self, interval: Duration) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.update_interval = interval;
        }
    }

    pub fn start(&self, operation: &str) {
        let total = match self.inner.lock() {
            Ok(mut inner) => {
                inner.progress.phase = ProgressPhase::Encoding;
                inner.start_time = Instant::now();
                inner.last_update = None;
                inner.progress.total_secs
            }
            Err(_) => return,
        };

        self.notify_callbacks(|cb| cb.on_start(operation, total));
    }

    /// Record `processed_secs` of output. Returns the snapshot sent to the
    /// callbacks, or `None` when the update was throttled or dropped.
    pub fn update(&self, processed_secs: f64, estimated: bool) -> Option<ExportProgress> {
        let snapshot = {
            let mut inner = self.inner.lock().ok()?;
            if inner.finished {
                return None;
            }

            let now = Instant::now();
            if let Some(last) = inner.last_update {
                if now.duration_since(last) < inner.update_interval {
                    return None;
                }
            }

            let total = inner.progress.total_secs;
            let percent = if total > 0.0 {
                (processed_secs / total * 100.0).clamp(0.0, MAX_RUNNING_PERCENT)
            } else {
                0.0
            };
            if percent < inner.progress.percent {
                return None;
            }

            let elapsed = now.duration_since(inner.start_time);
            inner.last_update = Some(now);
            inner.progress.percent = percent;
            inner.progress.processed_secs = processed_secs.clamp(0.0, total.max(0.0));
            inner.progress.elapsed = elapsed;
            inner.progress.estimated = estimated;
            inner.progress.eta = estimate_remaining(percent, elapsed);
            inner.progress.clone()
        };

        self.notify_callbacks(|cb| cb.on_progress(&snapshot));
        Some(snapshot)
    }

    /// Complete operation successfully
    pub fn complete(&self, message: Option<String>) {
        if !self.finish(ProgressPhase::Complete) {
            return;
        }
        if let Ok(mut inner) = self.inner.lock() {
            inner.progress.percent = 100.0;
            inner.progress.processed_secs = inner.progress.total_secs;
            inner.progress.eta = Some(Duration::ZERO);
        }

        self.notify_callbacks(|cb| cb.on_complete(message.clone()));
    }

    /// Mark operation as failed
    pub fn error(&self, error: &str) {
        if self.finish(ProgressPhase::Failed) {
            self.notify_callbacks(|cb| cb.on_error(error));
        }
    }

    /// Cancel operation
    pub fn cancel(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.cancelled = true;
        }
        if self.finish(ProgressPhase::Cancelled) {
            self.notify_callbacks(|cb| cb.on_cancel());
        }
    }

    /// Check if operation should be cancelled
    pub fn is_cancelled(&self) -> bool {
        if let Ok(inner) = self.inner.lock() {
            if inner.cancelled {
                return true;
            }
        }

        if let Ok(callbacks) = self.callbacks.lock() {
            return callbacks.iter().any(|cb| cb.should_cancel());
        }

        false
    }

    /// Get current progress information
    pub fn snapshot(&self) -> Option<ExportProgress> {
        self.inner.lock().ok().map(|inner| inner.progress.clone())
    }

    /// Move to a terminal phase; false if already there
    fn finish(&self, phase: ProgressPhase) -> bool {
        match self.inner.lock() {
            Ok(mut inner) if !inner.finished => {
                inner.finished = true;
                inner.progress.phase = phase;
                inner.progress.elapsed = inner.start_time.elapsed();
                true
            }
            _ => false,
        }
    }

    /// Notify all callbacks
    fn notify_callbacks<F>(&self, f: F)
    where
        F: Fn(&dyn ProgressCallback),
    {
        if let Ok(callbacks) = self.callbacks.lock() {
            for callback in callbacks.iter() {
                f(callback.as_ref());
            }
        }
    }
}

fn estimate_remaining(percent: f64, elapsed: Duration) -> Option<Duration> {
    if percent <= 0.0 || percent >= 100.0 {
        return None;
    }
    let total = elapsed.as_secs_f64() * 100.0 / percent;
    Some(Duration::from_secs_f64((total - elapsed.as_secs_f64()).max(0.0)))
}

/// Console progress callback for CLI usage; draws a bar on stderr
pub struct ConsoleProgressCallback {
    verbose: bool,
}

impl ConsoleProgressCallback {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_start(&self, operation: &str, total_secs: f64) {
        if self.verbose {
            eprintln!("Starting: {} ({:.1}s of footage)", operation, total_secs);
        }
    }

    fn on_progress(&self, progress: &ExportProgress) {
        let bar_length = 30;
        let filled = ((progress.percent / 100.0 * bar_length as f64) as usize).min(bar_length);
        let bar = "█".repeat(filled) + &"░".repeat(bar_length - filled);
        let marker = if progress.estimated { "~" } else { " " };
        let eta = progress
            .eta
            .map(|eta| format!(" ETA {}s", eta.as_secs()))
            .unwrap_or_default();

        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "\r[{}] {}{:>5.1}%{}   ", bar, marker, progress.percent, eta);
        let _ = stderr.flush();
    }

    fn on_complete(&self, message: Option<String>) {
        match message {
            Some(msg) => eprintln!("\rCompleted: {}", msg),
            None => eprintln!("\rExport completed successfully"),
        }
    }

    fn on_error(&self, error: &str) {
        eprintln!("\rError: {}", error);
    }

    fn on_cancel(&self) {
        eprintln!("\rExport cancelled");
    }
}

/// JSON-lines progress callback for structured output
pub struct JsonProgressCallback {
    output_progress_events: bool,
}

impl JsonProgressCallback {
    pub fn new(output_progress_events: bool) -> Self {
        Self { output_progress_events }
    }
}

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, operation: &str, total_secs: f64) {
        if self.output_progress_events {
            let event = serde_json::json!({
                "event": "start",
                "operation": operation,
                "total_secs": total_secs,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            println!("{}", event);
        }
    }

    fn on_progress(&self, progress: &ExportProgress) {
        if self.output_progress_events {
            let event = serde_json::json!({
                "event": "progress",
                "percent": progress.percent,
                "processed_secs": progress.processed_secs,
                "total_secs": progress.total_secs,
                "estimated": progress.estimated,
                "timestamp": chrono::Utc::now().to_rfc3339()
            });
            println!("{}", event);
        }
    }

    fn on_complete(&self, message: Option<String>) {
        let event = serde_json::json!({
            "event": "complete",
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_error(&self, error: &str) {
        let event = serde_json::json!({
            "event": "error",
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_cancel(&self) {
        let event = serde_json::json!({
            "event": "cancel",
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }
}
