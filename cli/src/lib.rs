mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use utils::error::Result;
use utils::settings;

#[derive(Parser, Debug)]
#[command(name = "printq", author, version, about, long_about = "printq CLI")]
pub struct Cli {
    /// Set a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommands
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every job of a job file through a dry-run printer
    Run {
        #[arg(help = "Path to a .yaml, .yml or .json job file.")]
        jobs: PathBuf,
        #[arg(help = "Pending queue capacity. Overrides dispatcher.queue_capacity.", long)]
        capacity: Option<usize>,
        #[arg(help = "Cancel the job being printed after this many milliseconds.", long)]
        cancel_after: Option<u64>,
        #[arg(
            help = "Stop the dispatcher after this many milliseconds instead of waiting for every job.",
            long
        )]
        stop_after: Option<u64>,
        #[arg(help = "Directory for the log file. Defaults to ~/.printq.", long)]
        log_dir: Option<PathBuf>,
    },
    /// Show Configuration
    Config,
}

pub fn cli_match() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config) = cli.config.as_deref() {
        settings::load_config(config)?;
    }

    match cli.command {
        Commands::Run {
            jobs,
            capacity,
            cancel_after,
            stop_after,
            log_dir,
        } => commands::run(commands::RunArgs {
            jobs_file: jobs,
            capacity,
            cancel_after,
            stop_after,
            log_dir,
        })?,
        Commands::Config => commands::config()?,
    }

    Ok(())
}
