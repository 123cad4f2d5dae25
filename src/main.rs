//! dashcut - dashcam footage timeline and multi-camera export
//!
//! # Usage
//!
//! ```bash
//! dashcut timeline --root /media/TeslaCam
//! dashcut locate --root /media/TeslaCam --percent 50
//! dashcut export --root /media/TeslaCam --start 10:00 --end 12:30 \
//!     --cameras front,back,left_repeater,right_repeater --output drive.mp4
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use dashcut::cli::{commands, Cli, Commands};
use dashcut::config_initialization::load_settings;
use dashcut::utils::logging::LoggingSystem;

/// Main entry point for the dashcut CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = cli.overrides();
    let settings = load_settings(cli.config.as_deref(), &overrides).context("Failed to load configuration")?;

    let logging = LoggingSystem::new(settings.logging.clone());
    logging.initialize();
    logging.log_system_info();
    debug!(?settings, "Effective settings");

    match cli.command {
        Commands::Timeline(args) => commands::timeline(args, &settings).await,
        Commands::Locate(args) => commands::locate(args, &settings).await,
        Commands::Export(args) => commands::export(args, &settings).await,
        Commands::Config(args) => commands::config(args, &settings),
    }
}
