//! Work Mate Player - Terminal driver for the character engine
//!
//! Runs the companion against clips on the local filesystem and takes state
//! and timer commands on stdin. Useful for checking an asset tree: every
//! load, swap and fallback is logged.
//!
//! # Usage
//!
//! ```bash
//! # Play the clips under ./demo
//! workmate-player
//!
//! # Another asset tree, starting away from the desk
//! workmate-player --assets /srv/clips --state away
//!
//! # Verbose logging
//! RUST_LOG=debug workmate-player
//! ```
//!
//! Type `work`, `break`, `away` or `slacking` to change the character, and
//! `start`, `pause`, `toggle`, `reset`, `status` or `quit` for the rest.

mod commands;
mod surface;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use workmate_core::{
    default_config_path, load_config_from_path, CharacterState, Companion, ConfigOverrides,
    WorkmateConfig,
};

use commands::{Command, HELP};
use surface::FsSurface;

/// Work Mate Player - drive the desk companion from a terminal
#[derive(Parser, Debug)]
#[command(name = "workmate-player")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "WORKMATE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Asset base path (overrides config)
    #[arg(short = 'a', long, value_name = "DIR")]
    assets: Option<String>,

    /// Initial character state (overrides config)
    #[arg(short = 's', long, value_name = "STATE")]
    state: Option<CharacterState>,

    /// Length of one-shot clips in seconds
    #[arg(long, default_value_t = 4)]
    clip_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "WORKMATE_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "workmate_player={level},workmate_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Apply one command; returns `false` when the player should exit
fn handle(companion: &Companion, command: Command) -> bool {
    match command {
        Command::State(state) => {
            if !companion.set_state(state) {
                println!("already {state}");
            }
        }
        Command::Start => companion.clock().start(),
        Command::Pause => companion.clock().pause(),
        Command::Toggle => {
            companion.clock().toggle();
        }
        Command::Reset => companion.clock().reset(),
        Command::Status => println!("{}", companion.status()),
        Command::Quit => return false,
    }
    true
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!("Work Mate Player starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load(&args)?;

    info!(
        assets = %config.layout.base_path,
        state = %config.initial_state,
        source = %config.source(),
        "Configuration loaded"
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(run(config, Duration::from_secs(args.clip_secs)))
}

/// Load, override and validate the configuration; blocking, so it runs
/// before the runtime exists
fn load(args: &Args) -> Result<WorkmateConfig> {
    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;

    let mut overrides = ConfigOverrides::new();
    if let Some(ref assets) = args.assets {
        overrides = overrides.with_base_path(assets.clone());
    }
    if let Some(state) = args.state {
        overrides = overrides.with_initial_state(state);
    }
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

async fn run(config: WorkmateConfig, clip_length: Duration) -> Result<()> {
    let surface = Arc::new(FsSurface::new(PathBuf::from("."), clip_length));
    let companion = Companion::new(surface, &config);
    companion.start();

    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("Input closed");
                    break;
                };
                match line.parse::<Command>() {
                    Ok(command) => {
                        if !handle(&companion, command) {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Ignoring input");
                        println!("{HELP}");
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for ctrl-c")?;
                info!("Interrupted");
                break;
            }
        }
    }

    companion.shutdown();
    Ok(())
}
