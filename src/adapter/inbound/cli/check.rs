//! Handler for the `check` command.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::{load_config, output};
use crate::adapter::outbound::env_credentials::EnvCredentials;
use crate::error::Result;
use crate::infrastructure::bootstrap::missing_credentials;

/// Validate configuration without starting the router.
pub fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let missing = missing_credentials(&config, &EnvCredentials::new());

    if output::is_json() {
        return output::json(&json!({
            "valid": true,
            "venues": config.venues.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
            "primary_venue": config.router.primary_venue,
            "backup_venues": config.router.backup_venues,
            "rules": config.rules.len(),
            "algorithm": config.balancer.algorithm,
            "missing_credentials": missing,
        }));
    }

    output::section("Configuration Check");
    match config_path {
        Some(path) => output::field("Config", path.display()),
        None => output::field("Config", "built-in defaults"),
    }
    output::success("Configuration is valid");

    output::section("Summary");
    let venues: Vec<&str> = config.venues.iter().map(|v| v.id.as_str()).collect();
    output::field("Venues", venues.join(", "));
    output::field("Primary", &config.router.primary_venue);
    output::field("Backups", config.router.backup_venues.join(", "));
    output::field("Rules", config.rules.len());
    output::field("Algorithm", format!("{:?}", config.balancer.algorithm));
    output::field("Smart routing", config.router.smart_routing);
    output::field("Auto failover", config.router.auto_failover);

    if missing.is_empty() {
        output::success("Credentials found for every enabled venue");
    } else {
        for venue in &missing {
            output::warning(&format!("No credentials for {venue} (dry-run only)"));
        }
    }
    Ok(())
}
