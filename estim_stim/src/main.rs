//! # estim Stimulation Binary
//!
//! Validates a stimulation configuration, optionally programs the switch
//! matrix, then uploads and plays the sequence.
//!
//! # Usage
//!
//! ```bash
//! # Print the generated sequences without touching any device
//! estim_stim --config config/stim.toml --dry-run
//!
//! # Export a .dat file and run with the switch matrix
//! estim_stim --config config/stim.toml --matrix config/matrix.toml --dat out.dat
//! ```

use clap::Parser;
use estim_common::config::{ConfigLoader, LogLevel};
use estim_common::stim::dat;
use estim_common::stim::sequence::PulseEvent;
use estim_hal::config::MatrixFileConfig;
use estim_hal::drivers::register_all_drivers;
use estim_hal::{DriverRegistry, MatrixCore, SpinDelay};
use estim_stim::{SessionOutcome, SimulatedStimulator, StimFileConfig, StimulationSession};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// estim Stim - waveform sequencer and session runner
#[derive(Parser, Debug)]
#[command(name = "estim_stim")]
#[command(version)]
#[command(about = "Generates stimulation trains and plays them on a stimulator")]
#[command(long_about = None)]
struct Args {
    /// Path to stimulation configuration file (stim.toml or .json)
    #[arg(short, long, default_value = "/etc/estim/stim.toml")]
    config: PathBuf,

    /// Switch-matrix configuration; channel roles are applied before the run
    #[arg(short, long)]
    matrix: Option<PathBuf>,

    /// Write the generated program as a .dat file
    #[arg(long)]
    dat: Option<PathBuf>,

    /// Print the sequences and exit without device I/O
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        let _ = tracing_subscriber::fmt().try_init();
        error!("estim_stim failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = StimFileConfig::load(&args.config)?;
    config.validate()?;
    setup_tracing(&args, config.shared.log_level);

    info!(
        "estim Stim v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let mut session = StimulationSession::new(config.device.clone());
    let prepared = session.prepare(&config.stimulation)?;

    if let Some(path) = &args.dat {
        dat::write_file(path, &prepared.program, &config.device.dat)?;
    }

    if args.dry_run {
        print_sequence("stim", &prepared.program.stim_sequence());
        print_sequence("sync", &prepared.program.sync_sequence());
        return Ok(());
    }

    let matrix = match &args.matrix {
        Some(path) => Some(open_matrix(path)?),
        None => None,
    };
    if let Some(core) = &matrix {
        session = session.with_matrix(core.clone());
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(true, Ordering::SeqCst);
    })?;

    let mut stimulator = SimulatedStimulator::new();
    let outcome = session.run(&config.stimulation, &mut stimulator, &cancel)?;
    match outcome {
        SessionOutcome::Completed { trains } => info!(trains, "Stimulation complete"),
        SessionOutcome::Cancelled { trains_completed } => {
            info!(trains_completed, "Stimulation cancelled")
        }
    }

    if let Some(core) = matrix {
        core.shutdown()?;
    }
    Ok(())
}

fn open_matrix(path: &Path) -> Result<Arc<MatrixCore>, Box<dyn std::error::Error>> {
    let config = MatrixFileConfig::load(path)?;
    config.validate()?;

    let mut registry = DriverRegistry::new();
    register_all_drivers(&mut registry)?;
    let backend = registry.create_driver(&config.driver)?;
    let core = MatrixCore::new(config.matrix.clone(), backend, Box::new(SpinDelay))?;
    if let Some(state) = config.initial_state()? {
        core.set_state(state)?;
    }
    Ok(Arc::new(core))
}

fn print_sequence(label: &str, events: &[PulseEvent]) {
    println!("{label} ({} entries)", events.len());
    for event in events {
        println!("  {:>6}  {:>8} us", event.amplitude, event.duration_us);
    }
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
