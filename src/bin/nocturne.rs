//! Nocturne CLI - Command-line interface for Nocturne
//!
//! Commands:
//! - report: Compute the nightly sleep report for a payload
//! - targets: Compute low/medium/high sleep-duration targets

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use nocturne::{nightly_report_from_json, sleep_targets_from_json, NOCTURNE_VERSION};

/// Nocturne - On-device sleep detection and focus-timeline engine
#[derive(Parser)]
#[command(name = "nocturne")]
#[command(version = NOCTURNE_VERSION)]
#[command(about = "Turn nightly sensor payloads into sleep reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the nightly sleep report for a payload
    Report {
        /// Input payload path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Compute low/medium/high sleep-duration targets
    Targets {
        /// Input request path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pretty-print the output JSON
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), NocturneCliError> {
    match cli.command {
        Commands::Report {
            input,
            output,
            pretty,
        } => {
            let payload = read_input(&input)?;
            let report = nightly_report_from_json(&payload)?;
            write_output(&output, &report, pretty)
        }

        Commands::Targets {
            input,
            output,
            pretty,
        } => {
            let request = read_input(&input)?;
            let targets = sleep_targets_from_json(&request)?;
            write_output(&output, &targets, pretty)
        }
    }
}

fn read_input(input: &Path) -> Result<String, NocturneCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            log::warn!("reading payload from a terminal; pipe or redirect a file");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, json: &str, pretty: bool) -> Result<(), NocturneCliError> {
    let rendered = if pretty {
        let value: serde_json::Value = serde_json::from_str(json)?;
        serde_json::to_string_pretty(&value)?
    } else {
        json.to_string()
    };

    if output.to_string_lossy() == "-" {
        println!("{rendered}");
    } else {
        fs::write(output, rendered)?;
    }
    Ok(())
}

enum NocturneCliError {
    Io(io::Error),
    Compute(nocturne::ComputeError),
    Json(serde_json::Error),
}

impl From<io::Error> for NocturneCliError {
    fn from(e: io::Error) -> Self {
        NocturneCliError::Io(e)
    }
}

impl From<nocturne::ComputeError> for NocturneCliError {
    fn from(e: nocturne::ComputeError) -> Self {
        NocturneCliError::Compute(e)
    }
}

impl From<serde_json::Error> for NocturneCliError {
    fn from(e: serde_json::Error) -> Self {
        NocturneCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<NocturneCliError> for CliError {
    fn from(e: NocturneCliError) -> Self {
        match e {
            NocturneCliError::Io(e) => CliError {
                code: "io".to_string(),
                message: e.to_string(),
                hint: Some("Check that the input path exists and is readable".to_string()),
            },
            NocturneCliError::Compute(e) => CliError {
                code: "compute".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Check the payload against the dataFromIOS/dataFromDatabase envelope"
                        .to_string(),
                ),
            },
            NocturneCliError::Json(e) => CliError {
                code: "json".to_string(),
                message: e.to_string(),
                hint: None,
            },
        }
    }
}
