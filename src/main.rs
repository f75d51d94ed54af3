// docrepo - Typed repository layer for MongoDB
// Copyright (c) 2025 docrepo Contributors
// Licensed under the MIT License

use clap::Parser;
use docrepo::cli::commands::EXIT_FATAL;
use docrepo::cli::{Cli, Commands};
use docrepo::config::LoggingConfig;
use docrepo::logging::init_logging;
use std::process;

#[tokio::main]
async fn main() {
    // Optional: a missing .env is ignored
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console-only logging for the CLI
    let log_level = cli.log_level.as_deref().unwrap_or("info");
    let logging_config = LoggingConfig {
        local_enabled: false,
        ..LoggingConfig::default()
    };
    let _guard = match init_logging(log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "docrepo starting");

    let exit_code = match execute_command(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            EXIT_FATAL
        }
    };

    process::exit(exit_code);
}

async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
        Commands::Ping(args) => args.execute(&cli.config, cli.dry_run).await,
        Commands::Status(args) => args.execute(&cli.config, cli.dry_run).await,
        Commands::Find(args) => args.execute(&cli.config, cli.dry_run).await,
    }
}
