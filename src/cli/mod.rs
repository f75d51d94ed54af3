//! CLI interface and argument parsing
//!
//! Operational entry points around the repository: configuration checks,
//! connectivity checks and ad-hoc queries.

pub mod commands;

use clap::{Parser, Subcommand};

/// docrepo - document repository toolkit
#[derive(Parser, Debug)]
#[command(name = "docrepo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "docrepo.toml", env = "DOCREPO_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "DOCREPO_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Use an empty in-memory store instead of connecting
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Check that the store is reachable
    Ping(commands::ping::PingArgs),

    /// Show connection settings and collection size
    Status(commands::status::StatusArgs),

    /// Query a collection and print matching documents as JSON
    Find(commands::find::FindArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["docrepo", "ping"]);
        assert_eq!(cli.config, "docrepo.toml");
        assert!(!cli.dry_run);
        assert!(matches!(cli.command, Commands::Ping(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["docrepo", "--config", "custom.toml", "status"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["docrepo", "--log-level", "debug", "validate-config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_find() {
        let cli = Cli::parse_from([
            "docrepo",
            "find",
            "--collection",
            "orders",
            "--filter",
            r#"{"status":"open"}"#,
            "--limit",
            "5",
            "--dry-run",
        ]);
        assert!(cli.dry_run);
        match cli.command {
            Commands::Find(args) => {
                assert_eq!(args.collection.as_deref(), Some("orders"));
                assert_eq!(args.limit, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["docrepo", "init", "--force"]);
        assert!(matches!(cli.command, Commands::Init(ref a) if a.force));
    }
}
