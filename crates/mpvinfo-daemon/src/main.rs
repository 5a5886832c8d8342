//! mpvinfo daemon
//!
//! Watches mpv's IPC socket and prints a status line to standard output
//! whenever an observed property changes.

mod cache;
mod format;
mod mpv_ipc;
mod output;
mod session;
mod supervisor;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::output::StatusWriter;
use crate::supervisor::{shutdown_signal, Supervisor};

/// Exit code for configuration problems found before the main loop starts
const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "mpvinfod")]
#[command(about = "Print mpv status lines for status bars")]
#[command(version)]
struct Args {
    /// Path to configuration file [default: <config dir>/mpvinfo/config.json]
    #[arg(short, long)]
    config: Option<String>,

    /// Log debug output to standard error
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Standard output carries the status line, logs go to standard error
    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Expand tilde in config path
    let config_path: Option<PathBuf> = args
        .config
        .as_deref()
        .map(|path| shellexpand::tilde(path).into_owned().into());

    let config = match mpvinfo_config::load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    tracing::info!(
        "Observing {} properties on {}",
        config.properties.len(),
        config.socket_path.display()
    );

    let mut supervisor = match Supervisor::new(config, StatusWriter::stdout()) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match run(&mut supervisor).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(supervisor: &mut Supervisor<std::io::Stdout>) -> Result<()> {
    let shutdown = shutdown_signal().context("Failed to install signal handlers")?;
    supervisor
        .run_until(shutdown)
        .await
        .context("Failed to write status line")
}
