//! Handler for the `simulate` command.

use std::path::Path;

use crate::adapter::inbound::cli::command::SimulateArgs;
use crate::adapter::inbound::cli::{load_config, output};
use crate::error::Result;
use crate::infrastructure::bootstrap::{build_router, simulated_collaborators};
use crate::infrastructure::runtime;

/// Route `args.orders` orders against simulated venues and print metrics.
pub async fn execute(config_path: Option<&Path>, args: &SimulateArgs) -> Result<()> {
    let config = load_config(config_path)?;
    config.init_logging();

    let router = build_router(&config, simulated_collaborators())?;
    let metrics = runtime::simulate(&router, args.orders, &args.symbol, &args.order_type).await;

    if output::is_json() {
        return output::json(&metrics);
    }

    output::section("Simulation");
    output::field("Orders", metrics.total_decisions);
    output::field("Successful", metrics.successful);
    output::field("Failed", metrics.failed);
    output::field("Success rate", format!("{:.1}%", metrics.success_rate * 100.0));
    output::field("Avg latency", format!("{:.1}ms", metrics.average_latency_ms));
    output::field("P95 latency", format!("{:.1}ms", metrics.p95_latency_ms));
    output::field("Route quality", format!("{:.3}", metrics.route_quality));
    output::field("Cost savings", metrics.cost_savings);

    output::section("Venues");
    for (venue, stats) in &metrics.venues {
        output::field(
            venue.as_str(),
            format!("{} orders ({:.1}%)", stats.orders, stats.share * 100.0),
        );
    }
    Ok(())
}
