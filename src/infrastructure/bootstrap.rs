//! Infrastructure bootstrap helpers for runtime wiring.

use std::sync::Arc;

use tracing::{info, warn};

use crate::adapter::outbound::simulated::{SimulatedExecutor, SimulatedFailover, SimulatedProber};
use crate::application::{Collaborators, Router};
use crate::domain::VenueId;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::CredentialProvider;

/// Dry-run collaborators: simulated probes, fills and transitions.
#[must_use]
pub fn simulated_collaborators() -> Collaborators {
    Collaborators {
        prober: Arc::new(SimulatedProber::default()),
        executor: Arc::new(SimulatedExecutor::default()),
        failover: Arc::new(SimulatedFailover),
    }
}

/// Build a router from validated configuration.
///
/// Venues configured with `enabled = false` start disabled.
pub fn build_router(config: &Config, collaborators: Collaborators) -> Result<Arc<Router>> {
    let router = Router::new(
        config.router_settings(),
        config.catalog(),
        config.routing_rules(),
        collaborators,
    )?;
    for venue in config.disabled_venues() {
        router.set_venue_enabled(&venue, false)?;
    }
    Ok(Arc::new(router))
}

/// Enabled venues the provider has no credentials for. Each is logged.
pub fn missing_credentials(config: &Config, provider: &dyn CredentialProvider) -> Vec<VenueId> {
    let missing: Vec<VenueId> = config
        .venues
        .iter()
        .filter(|v| v.enabled)
        .map(|v| v.venue_id())
        .filter(|id| provider.credentials(id).is_none())
        .collect();
    for venue in &missing {
        warn!(venue = %venue, "No credentials configured, venue usable in dry-run only");
    }
    if missing.is_empty() {
        info!("Credentials found for every enabled venue");
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Credentials;

    struct Only(&'static str);

    impl CredentialProvider for Only {
        fn credentials(&self, venue: &VenueId) -> Option<Credentials> {
            (venue.as_str() == self.0).then(|| Credentials {
                api_key: "k".into(),
                api_secret: "s".into(),
                passphrase: None,
            })
        }
    }

    #[test]
    fn reports_venues_without_credentials() {
        let mut config = Config::default();
        config.venues[2].enabled = false;
        let missing = missing_credentials(&config, &Only("binance"));
        assert_eq!(missing, vec![VenueId::new("okx")]);
    }

    #[tokio::test]
    async fn disabled_venues_start_disabled() {
        let mut config = Config::default();
        config.venues[1].enabled = false;
        let router = build_router(&config, simulated_collaborators()).unwrap();
        let status = router.venue_status(&VenueId::new("okx")).unwrap();
        assert!(!status.online);
        assert_eq!(router.status().online_venues, 2);
    }
}
