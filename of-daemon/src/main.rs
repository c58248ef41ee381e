//! Omenfan Daemon (omenfand)
//!
//! Privileged service running a fan program over the embedded controller
//! and the platform BIOS.
//!
//! # Requirements
//! - Root, for `/dev/port` and `/proc/acpi/call`
//! - The `acpi_call` kernel module for BIOS calls
//!
//! # Signals
//! - SIGINT/SIGTERM: terminate the program and exit
//! - SIGUSR1: suspend the program (call from a pre-sleep hook)
//! - SIGUSR2: resume the program (call from a post-sleep hook)

mod fan_control;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};

use of_core::{load_settings, Bios, EmbeddedController, FanProgram, Platform};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the log filter
const LOG_ENV: &str = "OMENFAN_LOG";

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs Omenfan fan programs on the embedded controller", long_about = None)]
struct CliArgs {
    /// Configuration file (default /etc/omenfan/config.json)
    #[arg(long, short = 'c', value_name = "FILE_PATH")]
    config: Option<PathBuf>,

    /// Log filter, overrides OMENFAN_LOG (trace, debug, info, warn, error)
    #[arg(long, short = 'l', value_name = "LEVEL")]
    log_level: Option<String>,

    /// Program to run instead of the configured default
    #[arg(long, short = 'p', value_name = "NAME")]
    program: Option<String>,
}

// ============================================================================
// Logging
// ============================================================================

/// Install the subscriber, returning whether the journal is used
fn init_logging(log_level: &str) -> bool {
    // Try to use journald first (for systemd systems), fall back to stdout
    if std::path::Path::new("/run/systemd/journal/socket").exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(log_level))
                    .init();
                return true;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(log_level)
        .init();
    false
}

// ============================================================================
// Privileges
// ============================================================================

fn verify_privileges() -> Result<(), &'static str> {
    // SAFETY: geteuid only returns the effective user id of the process.
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        return Err("Daemon must run as root (euid=0) for embedded controller access");
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let log_level = args
        .log_level
        .clone()
        .or_else(|| std::env::var(LOG_ENV).ok())
        .unwrap_or_else(|| "info".to_string());
    let use_journald = init_logging(&log_level);

    info!("STARTUP: omenfand {} starting", VERSION);
    info!("STARTUP: Logging to {}", if use_journald { "systemd journal" } else { "stdout" });

    if let Err(e) = verify_privileges() {
        error!("{}", e);
        std::process::exit(1);
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(of_core::constants::paths::config_file);
    let settings = load_settings(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let selection = fan_control::ProgramSelection {
        default: match args.program.clone().or_else(|| settings.default_program.clone()) {
            Some(name) => name,
            None => bail!("no fan program selected: set default_program or pass --program"),
        },
        alternate: settings.alternate_program.clone(),
    };
    let catalog = settings.catalog();
    if !catalog.contains(&selection.default) {
        bail!("fan program '{}' is not configured", selection.default);
    }
    info!(
        "STARTUP: {} fan programs, default {}, alternate {}",
        catalog.len(),
        selection.default,
        selection.alternate.as_deref().unwrap_or("none")
    );

    let ec = EmbeddedController::open(&settings.ec).context("opening embedded controller ports")?;
    let bios = Bios::open(&settings.bios);
    if !settings.bios.check_errors {
        warn!("STARTUP: BIOS status checking disabled");
    }

    let platform = Platform::new(Arc::new(ec), Arc::new(bios), &settings);
    let program = FanProgram::new(platform, catalog, settings.fan.clone());
    let interval = Duration::from_millis(settings.fan.update_interval_ms);

    fan_control::run_control_loop(program, selection, interval).await?;

    info!("SHUTDOWN: Daemon terminated gracefully");
    Ok(())
}
