//! drivecopy CLI - Copy files and directories to and from Google Drive
//!
//! Provides commands for:
//! - Uploading a file or a compressed directory as a new entry
//! - Replacing an existing entry's content
//! - Downloading an entry (and expanding directory archives)
//! - Authorizing access to Google Drive

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drivecopy_core::config::LoggingConfig;
use drivecopy_core::domain::TransferAction;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{auth::AuthCommand, transfer::TransferArgs};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "drivecopy",
    version,
    about = "Copy files and directories to and from Google Drive"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write log output to FILE
    #[arg(short = 'L', long = "log", global = true, value_name = "FILE")]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload a file or directory as a new entry
    Upload(TransferArgs),
    /// Download an entry to a local file or directory
    Download(TransferArgs),
    /// Replace the content of an existing entry
    Replace(TransferArgs),
    /// Authorization commands
    #[command(subcommand)]
    Auth(AuthCommand),
}

/// Installs the stderr layer and, when a log file is given, a plain-text file layer
fn init_tracing(verbose: u8, logging: &LoggingConfig, log_file: Option<&Path>) -> Result<()> {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file.or(logging.file.as_deref()) {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;
    init_tracing(cli.verbose, &config.logging, cli.log.as_deref())?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match &cli.command {
        Commands::Upload(args) => args.execute(TransferAction::Upload, &config, format).await,
        Commands::Download(args) => args.execute(TransferAction::Download, &config, format).await,
        Commands::Replace(args) => args.execute(TransferAction::Replace, &config, format).await,
        Commands::Auth(cmd) => cmd.execute(&config, format).await,
    }
}
