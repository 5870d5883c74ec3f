//! Balloon Overlay Daemon
//!
//! Headless balloon overlay for a desktop companion ("ghost"). The ghost
//! launches this binary as a child process and drives it over the child's
//! stdin/stdout with length-prefixed control frames; user interaction is
//! reported back over the ghost's session socket.
//!
//! # Usage
//!
//! ```bash
//! # Normally spawned by the ghost
//! ai-balloon
//!
//! # Override the tick and scale
//! ai-balloon --tick-ms 16 --scale 150
//!
//! # Custom configuration file and verbose logging
//! ai-balloon --config ~/.config/ai-balloon/overlay.toml --log-level debug
//! ```
//!
//! # Output
//!
//! stdout belongs to the control channel. All logging goes to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use balloon_core::{load_config_from_path, ConfigOverrides};

mod overlay;

/// Balloon Overlay Daemon
///
/// Lays out and renders speech balloons on behalf of a ghost process.
#[derive(Parser, Debug)]
#[command(name = "ai-balloon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "AI_BALLOON_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Milliseconds between dispatcher ticks
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,

    /// Initial display scale in percent
    #[arg(long, value_name = "PERCENT")]
    pub scale: Option<u32>,

    /// Sender name reported in session requests
    #[arg(long, value_name = "NAME")]
    pub sender: Option<String>,

    /// Balloon directory used when the ghost does not provide one
    #[arg(long, value_name = "DIR")]
    pub balloon_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "AI_BALLOON_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Command-line values that take precedence over file and environment
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ms) = self.tick_ms {
            overrides = overrides.with_tick_ms(ms);
        }
        if let Some(scale) = self.scale {
            overrides = overrides.with_scale(scale);
        }
        if let Some(ref sender) = self.sender {
            overrides = overrides.with_sender(sender.clone());
        }
        if let Some(ref dir) = self.balloon_dir {
            overrides = overrides.with_balloon_dir(dir.clone());
        }
        overrides
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ai_balloon={level},balloon_core={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Balloon overlay starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config =
        load_config_from_path(args.config.clone()).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        source = %config.source(),
        tick_ms = config.tick.as_millis(),
        scale = config.scale,
        "Configuration loaded"
    );

    match overlay::run(config).await {
        Ok(()) => {
            info!("Balloon overlay stopped cleanly");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Balloon overlay stopped with error");
            Err(e)
        }
    }
}
