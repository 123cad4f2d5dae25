//! Error handling module for dashcut

use std::time::Duration;

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Failures while driving the external transcoder
#[derive(Error, Debug)]
pub enum ExportError {
    /// Transcoder executable missing or not runnable
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Transcoder exited unsuccessfully
    #[error("Transcoder exited with {}: {stderr_tail}", describe_status(.status))]
    Process {
        status: Option<i32>,
        stderr_tail: String,
    },

    /// Transcoder ran past the allowed wall-clock time
    #[error("Export timed out after {}s: {stderr_tail}", .limit.as_secs())]
    Timeout {
        limit: Duration,
        stderr_tail: String,
    },

    /// Export cancelled by the user
    #[error("Export cancelled")]
    Cancelled,

    /// A concat list could not be written to the scratch directory
    #[error("Failed to write concat list: {0}")]
    ConcatList(#[source] std::io::Error),

    /// I/O error while talking to the transcoder
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (killed by signal)".to_string(),
    }
}

/// Main error type for dashcut operations
#[derive(Error, Debug)]
pub enum DashcutError {
    /// Timeline or export planning error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Export execution error
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Duration probe failed
    #[error("Failed to probe {path}: {message}")]
    Probe { path: String, message: String },

    /// Clip discovery failed
    #[error("Failed to scan clips: {message}")]
    Scan { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for dashcut operations
pub type DashcutResult<T> = std::result::Result<T, DashcutError>;
