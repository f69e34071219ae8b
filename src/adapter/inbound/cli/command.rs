//! Command-line interface definitions.
//!
//! Defines the CLI structure for the venue router using `clap`: run the
//! router in the foreground, validate a configuration file, or route a batch
//! of simulated orders.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Smart order router across trading venues
#[derive(Parser, Debug)]
#[command(name = "venue-router")]
#[command(version)]
pub struct Cli {
    /// Configuration file; built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level subcommands. `run` is the default.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the router until interrupted
    Run,

    /// Validate configuration and report missing credentials
    Check,

    /// Route a batch of orders against simulated venues
    Simulate(SimulateArgs),
}

/// Arguments for `venue-router simulate`.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of orders to route
    #[arg(short = 'n', long, default_value_t = 100)]
    pub orders: usize,

    /// Instrument symbol
    #[arg(long, default_value = "BTCUSDT")]
    pub symbol: String,

    /// Order type
    #[arg(long, default_value = "LIMIT")]
    pub order_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_the_default() {
        let cli = Cli::try_parse_from(["venue-router"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::try_parse_from(["venue-router", "simulate"]).unwrap();
        let Some(Commands::Simulate(args)) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.orders, 100);
        assert_eq!(args.symbol, "BTCUSDT");
        assert_eq!(args.order_type, "LIMIT");
    }

    #[test]
    fn config_flag_is_global() {
        let cli =
            Cli::try_parse_from(["venue-router", "check", "--config", "router.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Check)));
        assert_eq!(cli.config, Some(PathBuf::from("router.toml")));
    }
}
