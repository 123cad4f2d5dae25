// Domain errors - Error types for the domain layer

use std::fmt;

use crate::domain::model::CameraId;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Input that cannot be turned into a timeline (empty group, mixed timestamps)
    MalformedInput(String),
    /// Camera name outside the fixed camera set
    UnknownCamera(String),
    /// Export range is reversed, empty, or outside the footage
    InvalidRange { start: f64, end: f64, total: f64 },
    /// No selected camera has footage anywhere in the requested range
    EmptyExport { requested: Vec<CameraId> },
    /// Clip index does not exist in the timeline
    ClipIndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::MalformedInput(msg) => write!(f, "Malformed input: {}", msg),
            DomainError::UnknownCamera(name) => write!(f, "Unknown camera: {}", name),
            DomainError::InvalidRange { start, end, total } => write!(
                f,
                "Invalid export range: {:.3}s - {:.3}s (footage is {:.3}s long)",
                start, end, total
            ),
            DomainError::EmptyExport { requested } => {
                let names: Vec<&str> = requested.iter().map(|c| c.as_str()).collect();
                if names.is_empty() {
                    write!(f, "Nothing to export: no cameras selected")
                } else {
                    write!(
                        f,
                        "Nothing to export: no footage for [{}] in the requested range",
                        names.join(", ")
                    )
                }
            }
            DomainError::ClipIndexOutOfRange { index, len } => {
                write!(f, "Clip index {} out of range (timeline has {} clips)", index, len)
            }
        }
    }
}

impl std::error::Error for DomainError {}
