//! Handler for the `run` command.

use std::path::Path;

use tracing::{info, warn};

use crate::adapter::inbound::cli::load_config;
use crate::adapter::outbound::env_credentials::EnvCredentials;
use crate::error::Result;
use crate::infrastructure::bootstrap::{build_router, missing_credentials, simulated_collaborators};
use crate::infrastructure::runtime;

/// Run the router until ctrl-c, then log the final metrics.
pub async fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.init_logging();
    info!(version = env!("CARGO_PKG_VERSION"), "venue-router starting");

    missing_credentials(&config, &EnvCredentials::new());
    // Only simulated venue clients ship with the binary.
    let router = build_router(&config, simulated_collaborators())?;

    let metrics = runtime::run_until(router, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
        }
    })
    .await?;

    info!(metrics = %serde_json::to_string(&metrics)?, "Final routing metrics");
    info!("venue-router stopped");
    Ok(())
}
