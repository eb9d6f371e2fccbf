//! # estim HAL Binary
//!
//! Programs the 16-channel switch matrix.
//!
//! # Usage
//!
//! ```bash
//! # Channel 3 to anode
//! estim_hal --config config/matrix.toml set-channel 3 A
//!
//! # All 16 channels at once
//! estim_hal --config config/matrix.toml set-all CAGGGGGGGGGGGGGG
//!
//! # Current state as JSON
//! estim_hal --config config/matrix.toml status
//!
//! # Keep the matrix driven and read commands from stdin
//! estim_hal --config config/matrix.toml -v shell
//! ```

use clap::{Parser, Subcommand};
use estim_common::channel::{ChannelRole, ChannelState};
use estim_common::config::{ConfigLoader, LogLevel};
use estim_hal::config::MatrixFileConfig;
use estim_hal::drivers::register_all_drivers;
use estim_hal::persistence::StatePersistence;
use estim_hal::{DriverRegistry, MatrixCore, SpinDelay};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// estim HAL - switch-matrix driver
#[derive(Parser, Debug)]
#[command(name = "estim_hal")]
#[command(version)]
#[command(about = "Switch-matrix driver with pluggable digital-output backends")]
#[command(long_about = None)]
struct Args {
    /// Path to matrix configuration file (matrix.toml or .json)
    #[arg(short, long, default_value = "/etc/estim/matrix.toml")]
    config: PathBuf,

    /// Backend to load (overrides the config file)
    #[arg(short, long)]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Set one channel (1..=16) to A, C, G or F
    SetChannel {
        channel: i64,
        #[arg(value_parser = clap::value_parser!(ChannelRole))]
        signal: ChannelRole,
    },
    /// Set all 16 channels from an A/C/G/F string
    SetAll { signals: String },
    /// Print the current channel state as JSON
    Status,
    /// List registered backends
    Drivers,
    /// Read commands from stdin until EOF, `quit` or Ctrl-C
    Shell,
}

/// One line typed at the shell prompt.
#[derive(Parser, Debug)]
#[command(name = "estim>", no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    if let Err(e) = run() {
        // Config errors can happen before the configured subscriber exists.
        let _ = tracing_subscriber::fmt().try_init();
        error!("estim_hal failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = MatrixFileConfig::load(&args.config)?;
    config.validate()?;
    setup_tracing(&args, config.shared.log_level);

    info!(
        "estim HAL v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let mut registry = DriverRegistry::new();
    register_all_drivers(&mut registry)?;

    if matches!(args.command, Command::Drivers) {
        for name in registry.list_drivers() {
            println!("{name}");
        }
        return Ok(());
    }

    let driver_name = args.driver.as_deref().unwrap_or(&config.driver);
    let backend = registry.create_driver(driver_name)?;
    let core = MatrixCore::new(config.matrix.clone(), backend, Box::new(SpinDelay))?;

    let persistence = config.state_file.as_ref().map(StatePersistence::new);
    let restored = match &persistence {
        Some(p) => p.load().unwrap_or_else(|e| {
            warn!("Ignoring unreadable state file: {e}");
            None
        }),
        None => None,
    };
    if let Some(state) = restored.or(config.initial_state()?) {
        core.set_state(state)?;
    }

    match args.command {
        Command::Shell => run_shell(&core, persistence.as_ref())?,
        command => execute(&core, command, persistence.as_ref())?,
    }

    core.shutdown()?;
    info!("estim HAL shutdown complete");
    Ok(())
}

/// Run one command against the matrix; mutating commands save the state.
fn execute(
    core: &MatrixCore,
    command: Command,
    persistence: Option<&StatePersistence>,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = match command {
        Command::SetChannel { channel, signal } => {
            let state = core.set_channel(channel, signal)?;
            println!("Channel {channel} set to {signal}");
            state
        }
        Command::SetAll { signals } => {
            let state = core.set_all(&signals)?;
            println!("All channels set to {state}");
            state
        }
        Command::Status => {
            println!("{}", status_json(core.status(), core.outputs_enabled()));
            return Ok(());
        }
        Command::Drivers | Command::Shell => {
            return Err("command not available here".into());
        }
    };
    if let Some(p) = persistence {
        p.save(state)?;
    }
    Ok(())
}

fn run_shell(
    core: &MatrixCore,
    persistence: Option<&StatePersistence>,
) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    info!("Shell ready; commands: set-channel, set-all, status, quit");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        match ShellLine::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => {
                // Errors are reported per command and the shell keeps going.
                if let Err(e) = execute(core, parsed.command, persistence) {
                    error!("{e}");
                }
            }
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

fn status_json(state: ChannelState, outputs_enabled: bool) -> serde_json::Value {
    serde_json::json!({
        "signals": state.to_string(),
        "channels": state.roles().iter().map(ToString::to_string).collect::<Vec<_>>(),
        "outputs_enabled": outputs_enabled,
    })
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured.into()
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
