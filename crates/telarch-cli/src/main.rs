//! telarch command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Print the default configuration
//! telarch config
//!
//! # Build the histogram of a file of `time,value` samples
//! telarch histogram --input samples.csv --merge-gap 20000
//!
//! # Only the intervals of p1 ending after t=2000, and those after them
//! telarch histogram --input samples.csv --seek p1@2000
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use telarch_common::config::ArchiveConfig;

mod commands;

use commands::{HistogramRequest, SeekTarget};

/// telarch command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "telarch",
    version,
    about = "Command-line tool for the telarch archive"
)]
struct Args {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, default_value = "warn", env = "TELARCH_LOG_LEVEL")]
    log_level: String,

    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the configuration as TOML
    Config,

    /// Build the histogram of a sample file and print its intervals
    Histogram {
        /// File of `time,value` lines (milliseconds, value)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Name of the value column
        #[arg(long, default_value = "value")]
        column: String,

        /// Merge gap in milliseconds (defaults to the configured gap)
        #[arg(long, value_name = "MS")]
        merge_gap: Option<i64>,

        /// Start listing at the first interval of VALUE ending after TIME
        #[arg(long, value_name = "VALUE@TIME")]
        seek: Option<SeekTarget>,

        /// Only intervals ending at or after this time
        #[arg(long, value_name = "MS")]
        start: Option<i64>,

        /// Only intervals starting at or before this time
        #[arg(long, value_name = "MS")]
        end: Option<i64>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let mut config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Command::Histogram {
            input,
            column,
            merge_gap,
            seek,
            start,
            end,
        } => {
            if let Some(gap) = merge_gap {
                config.histogram.merge_gap_ms = gap;
            }
            info!("Reading samples from {}", input.display());
            let file = std::fs::File::open(&input)
                .with_context(|| format!("cannot open {}", input.display()))?;

            let request = HistogramRequest {
                column,
                seek,
                start,
                end,
            };
            let intervals = commands::histogram(std::io::BufReader::new(file), config, &request)?;
            print!("{}", commands::format_intervals(&request.column, &intervals));
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ArchiveConfig> {
    match path {
        Some(path) => ArchiveConfig::from_file(path)
            .with_context(|| format!("cannot load configuration {}", path.display())),
        None => Ok(ArchiveConfig::default()),
    }
}
