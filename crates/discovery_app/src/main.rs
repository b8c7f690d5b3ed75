mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use discovery_logging::discovery_error;
use log::LevelFilter;

use crate::config::PipelineConfig;
use crate::logging::LogDestination;

#[derive(Parser)]
#[command(name = "discovery")]
#[command(about = "Keyword-driven discovery of subtitled videos for a target language")]
#[command(version)]
struct Cli {
    /// Pipeline configuration file (RON)
    #[arg(short, long, global = true, default_value = "discovery.ron")]
    config: PathBuf,

    /// Log at debug level, including per-entry rejection reasons
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to ./discovery.log
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every unseen keyword once and update the url list
    Run,

    /// Poll the keyword file and start a run whenever new keywords appear
    Watch,

    /// Show keyword progress and snapshot totals
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = if cli.log_file {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    };
    logging::initialize(destination, level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            discovery_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = PipelineConfig::load(&cli.config)?;
    match cli.command {
        Commands::Run => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::run_once(&config))?;
        }
        Commands::Watch => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::watch(&config))?;
        }
        Commands::Status => commands::status(&config)?,
    }
    Ok(())
}
