//! # mobcheck CLI entry point
//!
//! Parses command-line arguments, loads the checker configuration, and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mobcheck_cli::check::{run_on_select, OnSelectArgs};
use mobcheck_cli::config::CheckerConfig;
use mobcheck_cli::find_repo_root;

/// Protocol conformance checker for mobility network messages.
#[derive(Parser, Debug)]
#[command(name = "mobcheck", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a recorded on_select message.
    OnSelect(OnSelectArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let base = find_repo_root(&cwd).unwrap_or_else(|| {
        tracing::warn!("could not locate a schemas/ directory; using current directory");
        cwd.clone()
    });
    tracing::debug!(base = %base.display(), "resolved default schema root");

    let config = match CheckerConfig::resolve(cli.config.as_deref(), &base) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Commands::OnSelect(args) => run_on_select(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
