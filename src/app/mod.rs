// Application layer - Use case interactors

pub mod export_interactor;
pub mod timeline_interactor;

// Re-export interactors
pub use export_interactor::{ExportInteractor, ExportRequest, ExportResponse};
pub use timeline_interactor::{TimelineInteractor, TimelineReport};
