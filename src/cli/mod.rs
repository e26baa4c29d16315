//! Command-line interface
//!
//! clap-derived argument parsing and the command implementations.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::check::CheckArgs;
use commands::run::RunArgs;

#[derive(Parser, Debug)]
#[command(name = "trimwise")]
#[command(about = "Iterative FASTQ trimming optimizer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (merged over trimwise.yaml and defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Optimize trimming parameters for one or more FASTQ files
    Run(RunArgs),
    /// Check that FastQC, fastp and the recommendation service are usable
    Check(CheckArgs),
}

/// Print a top-level error in the requested format.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) {
    if json_mode {
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": err.chain().skip(1).map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
}
