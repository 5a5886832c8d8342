//! mpvinfo CLI
//!
//! Configuration tool for the mpvinfo daemon.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use mpvinfo_config::{Config, ConfigFile, ValueKind};

#[derive(Parser, Debug)]
#[command(name = "mpvinfo")]
#[command(about = "Configuration tool for the mpvinfo status reporter")]
#[command(version)]
struct Cli {
    /// Path to configuration file [default: <config dir>/mpvinfo/config.json]
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// Print the built-in default configuration as JSON
    Defaults {
        /// Write to this file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show where the configuration file is looked up
    Path,
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate => cmd_validate(cli.config.as_deref()),
        Commands::Defaults { output } => cmd_defaults(output),
        Commands::Path => cmd_path(cli.config.as_deref()),
    }
}

fn cmd_validate(config_path: Option<&Path>) -> miette::Result<()> {
    match config_path.map(Path::to_path_buf).or_else(mpvinfo_config::default_config_path) {
        Some(path) => println!("Validating configuration: {}", path.display()),
        None => println!("Validating built-in defaults"),
    }

    let config = mpvinfo_config::load_config(config_path)?;
    print_summary(&config);
    Ok(())
}

fn print_summary(config: &Config) {
    println!("Configuration is valid!");
    println!("  Socket: {}", config.socket_path.display());
    println!("  Client id: {}", config.client_id);
    println!("  Output: {:?}", config.output_template.as_str());
    println!("  Properties: {}", config.properties.len());
    for spec in &config.properties {
        let kind = match spec.kind {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
        };
        let required = if spec.required { ", required" } else { "" };
        println!("    - {} ({}{}): {:?}", spec.name, kind, required, spec.template);
    }
}

fn cmd_defaults(output: Option<PathBuf>) -> miette::Result<()> {
    let file = ConfigFile::from(&Config::default());
    let content = serde_json::to_string_pretty(&file).into_diagnostic()?;

    match output {
        Some(path) => {
            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).into_diagnostic()?;
            }
            std::fs::write(&path, format!("{}\n", content)).into_diagnostic()?;
            println!("Wrote default configuration: {}", path.display());
        }
        None => println!("{}", content),
    }

    Ok(())
}

fn cmd_path(config_path: Option<&Path>) -> miette::Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => mpvinfo_config::default_config_path()
            .ok_or_else(|| miette::miette!("No platform configuration directory found"))?,
    };

    let state = if path.exists() { "exists" } else { "not found, defaults apply" };
    println!("{} ({})", path.display(), state);
    Ok(())
}
