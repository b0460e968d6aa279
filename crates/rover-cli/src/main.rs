//! `rover-cli` – Rover bench runner
//!
//! This binary is the process entry point for the navigation loop.  It:
//!
//! 1. Loads the vehicle configuration (first argument, `$ROVER_CONFIG`, or
//!    `~/.rover/config.toml`; defaults when the file is missing).
//! 2. Builds the vehicle from simulated drivers matching the configured
//!    sensor layout.
//! 3. Runs the control loop until **Ctrl-C** or `--cycles N`, then brakes
//!    and centres the steering.
//!
//! ```text
//! rover [CONFIG] [--cycles N] [--write-default]
//! ```

mod bench;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use rover_control::{ControlLoop, MonotonicClock, RunContext, telemetry};
use rover_hal::StopFlag;
use tracing::{error, info, warn};

/// Reactive obstacle-avoiding navigation loop
#[derive(Debug, Parser)]
#[command(name = "rover")]
#[command(about = "Run the navigation loop on the bench vehicle", long_about = None)]
#[command(version)]
struct CliArgs {
    /// Config file (default: $ROVER_CONFIG, then ~/.rover/config.toml)
    config: Option<PathBuf>,

    /// Stop after this many control cycles
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,

    /// Write the default config to the config path and exit
    #[arg(long)]
    write_default: bool,
}

fn main() -> ExitCode {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG sets the filter, ROVER_LOG_FORMAT=json switches to JSON lines.
    telemetry::init_tracing();

    let args = CliArgs::parse();

    print_banner();

    let path = config::resolve_path(args.config.clone());

    if args.write_default {
        return match config::save_to(&config::Config::default(), &path) {
            Ok(()) => {
                println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    path.display().to_string().bold()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                println!("{}: {}", "Error saving config".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    let cfg = match config::load(&path) {
        Ok(cfg) => {
            println!("  Config: {}", path.display().to_string().bold());
            cfg
        }
        Err(e) => {
            error!(error = %e, "configuration rejected");
            println!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    // ── Stop flag ─────────────────────────────────────────────────────────
    let stop = StopFlag::new();
    let stop_handler = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after this cycle …".yellow().bold());
        stop_handler.request();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; stop with --cycles instead");
    }

    let (vehicle, probes) = match bench::build_vehicle(&cfg) {
        Ok(built) => built,
        Err(e) => {
            error!(error = %e, "vehicle bring-up failed");
            println!("{}: {}", "Bring-up error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut ctx = RunContext::new(Box::new(stop)).with_status_led(Box::new(probes.status_led.clone()));
    ctx.init();
    if !ctx.wait_for_start() {
        info!("stopped before start");
        return ExitCode::SUCCESS;
    }

    let mut control = ControlLoop::new(vehicle, cfg.navigation, cfg.control, MonotonicClock::new());
    let summary = control.run(&mut ctx, args.cycles);
    control.shutdown(&mut ctx);

    println!();
    println!("{}", "Run summary".bold().underline());
    println!("  cycles            : {}", summary.cycles);
    println!("  range samples     : {}", summary.samples);
    println!("  motor commands    : {}", summary.motor_commands);
    println!("  steering commands : {}", summary.steering_commands);
    println!(
        "  final outputs     : esc {} / servo {}",
        probes.esc.last().unwrap_or(0),
        probes.servo.last().unwrap_or(0)
    );
    ExitCode::SUCCESS
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("  {} {}", "rover".bold().cyan(), format!("v{}", env!("CARGO_PKG_VERSION")).dimmed());
    println!("  Reactive obstacle-avoiding navigation loop");
    println!();
}
