//! nft-tools CLI - Main entry point

use std::process;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use nft_cli::{Cli, Commands};
use nft_common::logging::{init_logging, LogConfig, LogGuard, LogLevel, LogOutput};
use tracing::error;

#[tokio::main]
async fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // The CLI keeps working without logging
    let log_guard = match init_cli_logging(cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {:#}", "Warning:".yellow(), e);
            None
        },
    };

    let result = execute_command(&cli).await;

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("{} {}", "Error:".red().bold(), e);
        drop(log_guard);
        process::exit(1);
    }
}

/// Console logging at warn (debug with --verbose); `LOG_*` variables take precedence
fn init_cli_logging(verbose: bool) -> anyhow::Result<LogGuard> {
    let level = if verbose { LogLevel::Debug } else { LogLevel::Warn };
    let config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("nft-tools")
        .build()
        .merge_env()
        .context("invalid LOG_* environment variable")?;

    init_logging(&config).context("failed to initialize logging")
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> nft_cli::Result<()> {
    match &cli.command {
        Commands::FetchMetadata(args) => {
            nft_cli::commands::fetch::run(args.clone()).await?;
            Ok(())
        },
    }
}
