// Adapters - External system implementations

pub mod manifest;
pub mod probe_ffprobe;
pub mod scan_fs;
pub mod toml_config;

// Re-export adapters
pub use manifest::ManifestScanner;
pub use probe_ffprobe::FfprobeAdapter;
pub use scan_fs::FsScanner;
pub use toml_config::{Settings, TomlConfigAdapter};
