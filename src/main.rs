//! Trimwise CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use trimwise::cli::{commands, handle_error, Cli, Commands};
use trimwise::infrastructure::logging::{LogConfig, LoggerImpl};
use trimwise::infrastructure::ConfigLoader;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = cli.json;

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            handle_error(&err, json_mode);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    if let Commands::Run(args) = &cli.command {
        args.apply(&mut config);
    }
    ConfigLoader::validate(&config)?;

    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, config, cli.json).await,
        Commands::Check(args) => commands::check::execute(args, config, cli.json).await,
    }
}
