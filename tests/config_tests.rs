//! Configuration files end to end: load, validate, build a router.

mod support;

use std::path::PathBuf;

use venue_router::application::BalancingAlgorithm;
use venue_router::domain::{OrderId, VenueId};
use venue_router::error::{ConfigError, Error};
use venue_router::infrastructure::bootstrap::build_router;
use venue_router::infrastructure::config::Config;
use venue_router::testkit::config::fast_collaborators;

use support::write_config;

#[test]
fn example_config_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.example.toml");
    let config = Config::load(path).unwrap();

    assert_eq!(config.venues.len(), 3);
    assert_eq!(config.rules.len(), 3);
    assert_eq!(config.balancer.algorithm, BalancingAlgorithm::Weighted);
    assert_eq!(config.venues[1].rest_api.version, "v5");
}

#[test]
fn missing_file_is_a_read_error() {
    let err = Config::load("/nonexistent/venue-router.toml").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let file = write_config("[router\nprimary_venue = ");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
}

#[tokio::test]
async fn custom_catalog_builds_a_working_router() {
    let file = write_config(
        r#"
rules = []

[router]
primary_venue = "alpha"
backup_venues = ["beta"]

[balancer]
algorithm = "round_robin"

[[venues]]
id = "alpha"
symbols = ["SOLUSDT"]
rest_api = { base_url = "https://alpha.example.com" }

[[venues]]
id = "beta"
priority = 2
symbols = ["SOLUSDT"]
rest_api = { base_url = "https://beta.example.com" }

[[venues]]
id = "gamma"
enabled = false
symbols = ["SOLUSDT"]
rest_api = { base_url = "https://gamma.example.com" }
"#,
    );
    let config = Config::load(file.path()).unwrap();
    let (collaborators, rig) = fast_collaborators();
    let router = build_router(&config, collaborators).unwrap();

    let gamma = router.venue_status(&VenueId::new("gamma")).unwrap();
    assert!(!gamma.online);

    let outcome = router
        .route_order(OrderId::new("o-1"), "SOLUSDT", "LIMIT")
        .await;
    assert!(outcome.is_ok());
    assert_eq!(outcome.decision.selected_venue, Some(VenueId::new("alpha")));
    assert_eq!(rig.executor.venues(), vec![VenueId::new("alpha")]);
}

#[test]
fn invalid_values_name_their_field() {
    let file = write_config("[failover]\nrecovery_threshold = 1.5\n");
    match Config::load(file.path()).unwrap_err() {
        Error::Config(ConfigError::InvalidValue { field, .. }) => {
            assert_eq!(field, "recovery_threshold");
        }
        other => panic!("unexpected error: {other}"),
    }
}
