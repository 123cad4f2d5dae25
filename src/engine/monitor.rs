//! Transcoder execution and progress monitoring

use std::collections::{BTreeMap, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::engine::command::{concat_list_contents, CommandSpec};
use crate::engine::progress::ProgressTracker;
use crate::error::ExportError;
use crate::utils::time::parse_progress_time;

/// Diagnostic lines kept for error messages
const STDERR_TAIL_LINES: usize = 20;
/// Highest share of the output the wall-clock fallback will claim
const MAX_ESTIMATED_SHARE: f64 = 0.99;

/// Monitor settings
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub ffmpeg_path: PathBuf,
    /// Where concat lists are written; the system temp dir when unset
    pub scratch_dir: Option<PathBuf>,
    /// Maximum wall-clock time for one export
    pub timeout: Duration,
    /// Cancellation and fallback checks run this often
    pub poll_interval: Duration,
    /// Without a time marker for this long, report the fallback estimate
    pub stall_window: Duration,
    /// Output seconds assumed per wall-clock second for the fallback
    pub assumed_throughput: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            scratch_dir: None,
            timeout: Duration::from_secs(4 * 3600),
            poll_interval: Duration::from_millis(250),
            stall_window: Duration::from_secs(5),
            assumed_throughput: 0.5,
        }
    }
}

/// Shared cancellation flag for a running export
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect within one poll interval
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Concat lists owned by one export; removed when dropped
struct ConcatLists {
    files: Vec<NamedTempFile>,
    paths: BTreeMap<usize, PathBuf>,
}

impl ConcatLists {
    fn write(spec: &CommandSpec, scratch_dir: &Path) -> Result<Self, ExportError> {
        let mut lists = Self {
            files: Vec::new(),
            paths: BTreeMap::new(),
        };

        for (index, sources) in spec.concat_inputs() {
            let mut file = tempfile::Builder::new()
                .prefix("dashcut-concat-")
                .suffix(".txt")
                .tempfile_in(scratch_dir)
                .map_err(ExportError::ConcatList)?;
            file.write_all(concat_list_contents(sources).as_bytes())
                .and_then(|_| file.flush())
                .map_err(ExportError::ConcatList)?;

            debug!(input = index, path = %file.path().display(), files = sources.len(), "Wrote concat list");
            lists.paths.insert(index, file.path().to_path_buf());
            lists.files.push(file);
        }
        Ok(lists)
    }

    fn remove(self) {
        for file in self.files {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                warn!(path = %path.display(), error = %e, "Failed to remove concat list");
            }
        }
    }
}

enum Step {
    Exited(std::io::Result<ExitStatus>),
    Line(Option<String>),
    Tick,
}

enum Outcome {
    Exited(ExitStatus),
    Cancelled,
    TimedOut,
}

/// Runs transcoder commands and reports their progress
#[derive(Debug, Clone, Default)]
pub struct ExportMonitor {
    config: MonitorConfig,
}

impl ExportMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run `spec` to completion.
    ///
    /// Concat lists are written before the transcoder starts and removed
    /// before this returns, whatever the outcome.
    pub async fn execute(
        &self,
        spec: &CommandSpec,
        tracker: &ProgressTracker,
        cancel: &CancelHandle,
    ) -> Result<PathBuf, ExportError> {
        if cancel.is_cancelled() {
            tracker.cancel();
            return Err(ExportError::Cancelled);
        }

        let scratch_dir = self
            .config
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let lists = ConcatLists::write(spec, &scratch_dir)?;

        let result = self.run(spec, &lists.paths, tracker, cancel).await;
        lists.remove();

        match &result {
            Ok(output) => info!(output = %output.display(), "Export finished"),
            Err(ExportError::Cancelled) => info!("Export cancelled"),
            Err(e) => error!(error = %e, "Export failed"),
        }
        result
    }

    async fn run(
        &self,
        spec: &CommandSpec,
        concat_paths: &BTreeMap<usize, PathBuf>,
        tracker: &ProgressTracker,
        cancel: &CancelHandle,
    ) -> Result<PathBuf, ExportError> {
        let program = &self.config.ffmpeg_path;
        let args = spec.args(concat_paths);
        info!(program = %program.display(), ?args, "Starting transcoder");

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                let e = ExportError::Spawn {
                    program: program.display().to_string(),
                    source,
                };
                tracker.error(&e.to_string());
                e
            })?;

        let (sender, mut lines) = mpsc::unbounded_channel();
        let reader = child.stderr.take().map(|stderr| tokio::spawn(read_lines(stderr, sender)));

        tracker.start("export");
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut last_marker: Option<Instant> = None;
        let mut stderr_open = reader.is_some();

        let outcome = loop {
            let step = tokio::select! {
                status = child.wait() => Step::Exited(status),
                line = lines.recv(), if stderr_open => Step::Line(line),
                _ = ticker.tick() => Step::Tick,
            };

            match step {
                Step::Exited(status) => break Outcome::Exited(status?),
                Step::Line(Some(line)) => {
                    if let Some(processed) = parse_progress_time(&line) {
                        last_marker = Some(Instant::now());
                        tracker.update(processed, false);
                    } else {
                        push_tail(&mut tail, line);
                    }
                }
                Step::Line(None) => stderr_open = false,
                Step::Tick => {
                    if cancel.is_cancelled() || tracker.is_cancelled() {
                        break Outcome::Cancelled;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        break Outcome::TimedOut;
                    }
                    let stalled = last_marker.unwrap_or(started);
                    if now.duration_since(stalled) >= self.config.stall_window {
                        let estimate = now.duration_since(started).as_secs_f64() * self.config.assumed_throughput;
                        tracker.update(estimate.min(spec.duration * MAX_ESTIMATED_SHARE), true);
                    }
                }
            }
        };

        match outcome {
            Outcome::Exited(status) => {
                // Whatever the transcoder printed last explains its exit
                drain_reader(reader, &mut lines, &mut tail, tracker).await;
                if status.success() {
                    tracker.complete(Some(spec.output.display().to_string()));
                    Ok(spec.output.clone())
                } else {
                    let e = ExportError::Process {
                        status: status.code(),
                        stderr_tail: join_tail(&tail),
                    };
                    tracker.error(&e.to_string());
                    Err(e)
                }
            }
            Outcome::Cancelled => {
                stop(&mut child, reader).await;
                tracker.cancel();
                Err(ExportError::Cancelled)
            }
            Outcome::TimedOut => {
                stop(&mut child, reader).await;
                while let Ok(line) = lines.try_recv() {
                    push_tail(&mut tail, line);
                }
                let e = ExportError::Timeout {
                    limit: self.config.timeout,
                    stderr_tail: join_tail(&tail),
                };
                tracker.error(&e.to_string());
                Err(e)
            }
        }
    }
}

/// Forward stderr as lines. Progress updates end in `\r`, so both `\r` and
/// `\n` terminate a line.
async fn read_lines(mut stderr: tokio::process::ChildStderr, sender: mpsc::UnboundedSender<String>) {
    let mut buf = [0u8; 4096];
    let mut line: Vec<u8> = Vec::new();

    loop {
        let read = match stderr.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(read) => read,
        };
        for &byte in &buf[..read] {
            if byte == b'\r' || byte == b'\n' {
                if !line.is_empty() {
                    let text = String::from_utf8_lossy(&line).into_owned();
                    line.clear();
                    if sender.send(text).is_err() {
                        return;
                    }
                }
            } else {
                line.push(byte);
            }
        }
    }

    if !line.is_empty() {
        let _ = sender.send(String::from_utf8_lossy(&line).into_owned());
    }
}

/// Collect whatever stderr is still in flight after exit. Grandchildren may
/// hold the pipe open, so waiting is bounded.
async fn drain_reader(
    reader: Option<JoinHandle<()>>,
    lines: &mut mpsc::UnboundedReceiver<String>,
    tail: &mut VecDeque<String>,
    tracker: &ProgressTracker,
) {
    if let Some(mut handle) = reader {
        if tokio::time::timeout(Duration::from_secs(1), &mut handle).await.is_err() {
            handle.abort();
        }
    }
    while let Ok(line) = lines.try_recv() {
        match parse_progress_time(&line) {
            Some(processed) => {
                tracker.update(processed, false);
            }
            None => push_tail(tail, line),
        }
    }
}

async fn stop(child: &mut Child, reader: Option<JoinHandle<()>>) {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill transcoder");
    }
    if let Some(handle) = reader {
        handle.abort();
    }
}

fn push_tail(tail: &mut VecDeque<String>, line: String) {
    if tail.len() == STDERR_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

fn join_tail(tail: &VecDeque<String>) -> String {
    tail.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
}
