use anyhow::Context;
use clap::Parser;

use venue_router::adapter::inbound::cli::command::{Cli, Commands};
use venue_router::adapter::inbound::cli::{check, output, run, simulate};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    output::set_json(cli.json);

    let config = cli.config.as_deref();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run::execute(config).await.context("router failed"),
        Commands::Check => check::execute(config).context("configuration check failed"),
        Commands::Simulate(args) => simulate::execute(config, &args)
            .await
            .context("simulation failed"),
    }
}
