//! Sulfur voice service.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌──────────────────────────────────────────────────────┐
//!                │                    VOICE SERVICE                      │
//!   text         │  ┌─────────┐    ┌──────────────┐    ┌─────────────┐  │
//!   ─────────────┼─▶│ circuit │───▶│ retry loop + │───▶│  synthesis  │──┼──▶ TTS service
//!                │  │ breaker │    │voice fallback│    │   backend   │  │
//!                │  └────▲────┘    └──────┬───────┘    └─────────────┘  │
//!   audio file   │       │                │                             │
//!   ◀────────────┼───────┴────────────────┘                             │
//!                │                                                      │
//!                │  ┌────────────┐ ┌────────────┐ ┌──────────────────┐  │
//!                │  │ admin API  │ │ diagnostics│ │ config + reload  │  │
//!                │  └────────────┘ └────────────┘ └──────────────────┘  │
//!                └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use sulfur_voice::config::{load_config, VoiceConfig};
use sulfur_voice::lifecycle::startup;
use sulfur_voice::observability::logging;

#[derive(Parser)]
#[command(name = "sulfur-voice")]
#[command(about = "Resilient text-to-speech service", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "SULFUR_VOICE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => VoiceConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), config = ?args.config, "sulfur-voice starting");

    startup::run(config, args.config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
