//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates every section. All
//! sections are optional; an empty file yields the built-in three-venue
//! catalog and default rules.
//!
//! # Example
//!
//! ```no_run
//! use venue_router::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::logging::LoggingConfig;
use super::router::{
    BalancerConfig, FailoverConfig, HealthConfig, MetricsConfig, OptimizerConfig, RouterConfig,
};
use super::rules::{default_rules, RuleConfig};
use super::venue::{default_venues, VenueConfig};
use crate::application::RouterSettings;
use crate::domain::{RoutingRule, Venue, VenueId};
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub balancer: BalancerConfig,

    #[serde(default)]
    pub failover: FailoverConfig,

    #[serde(default)]
    pub optimizer: OptimizerConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Venue catalog; its order is the canonical candidate order.
    #[serde(default = "default_venues")]
    pub venues: Vec<VenueConfig>,

    /// Routing rules. Omitting the key installs the default rules, which
    /// reference `binance`; set `rules = []` for a catalog without it.
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            router: RouterConfig::default(),
            health: HealthConfig::default(),
            balancer: BalancerConfig::default(),
            failover: FailoverConfig::default(),
            optimizer: OptimizerConfig::default(),
            metrics: MetricsConfig::default(),
            venues: default_venues(),
            rules: default_rules(),
        }
    }
}

impl Config {
    /// Parse and validate configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        self.validate_venues()?;
        self.validate_router()?;
        self.validate_health()?;
        self.validate_balancer()?;
        self.validate_failover()?;
        self.validate_optimizer()?;
        self.validate_rules()
    }

    fn validate_venues(&self) -> Result<()> {
        if self.venues.is_empty() {
            return Err(invalid("venues", "at least one venue is required"));
        }
        let mut seen = HashSet::new();
        for venue in &self.venues {
            venue.validate()?;
            if !seen.insert(venue.id.as_str()) {
                return Err(invalid("venues.id", format!("duplicate venue {}", venue.id)));
            }
        }
        Ok(())
    }

    fn validate_router(&self) -> Result<()> {
        let known = self.venue_ids();
        if !known.contains(&VenueId::new(self.router.primary_venue.as_str())) {
            return Err(invalid(
                "primary_venue",
                format!("unknown venue {}", self.router.primary_venue),
            ));
        }
        for backup in &self.router.backup_venues {
            if !known.contains(&VenueId::new(backup.as_str())) {
                return Err(invalid("backup_venues", format!("unknown venue {backup}")));
            }
        }
        Ok(())
    }

    fn validate_health(&self) -> Result<()> {
        let health = &self.health;
        if health.check_interval_secs == 0 {
            return Err(invalid("check_interval_secs", "must be greater than 0"));
        }
        if health.probe_timeout_ms == 0 {
            return Err(invalid("probe_timeout_ms", "must be greater than 0"));
        }
        if !unit_interval(health.threshold) {
            return Err(invalid("health.threshold", "must be between 0 and 1"));
        }
        if health.stats_window == 0 {
            return Err(invalid("stats_window", "must be greater than 0"));
        }
        Ok(())
    }

    fn validate_balancer(&self) -> Result<()> {
        let balancer = &self.balancer;
        if balancer.rebalance_interval_secs == 0 {
            return Err(invalid("rebalance_interval_secs", "must be greater than 0"));
        }
        if !unit_interval(balancer.rebalance_tolerance) {
            return Err(invalid("rebalance_tolerance", "must be between 0 and 1"));
        }
        if !unit_interval(balancer.adjustment_rate) {
            return Err(invalid("adjustment_rate", "must be between 0 and 1"));
        }
        if balancer.min_weight.is_nan() || balancer.min_weight <= 0.0 {
            return Err(invalid("min_weight", "must be greater than 0"));
        }
        Ok(())
    }

    fn validate_failover(&self) -> Result<()> {
        let failover = &self.failover;
        if !unit_interval(failover.health_threshold) {
            return Err(invalid("failover.health_threshold", "must be between 0 and 1"));
        }
        if !unit_interval(failover.recovery_threshold) {
            return Err(invalid("recovery_threshold", "must be between 0 and 1"));
        }
        if failover.recovery_threshold < failover.health_threshold {
            return Err(invalid(
                "recovery_threshold",
                "must be >= failover.health_threshold",
            ));
        }
        if !unit_interval(failover.error_rate_limit) {
            return Err(invalid("error_rate_limit", "must be between 0 and 1"));
        }
        if failover.consecutive_failure_limit == 0 {
            return Err(invalid("consecutive_failure_limit", "must be greater than 0"));
        }
        if failover.latency_threshold_ms == 0 {
            return Err(invalid("latency_threshold_ms", "must be greater than 0"));
        }
        if failover.scan_interval_secs == 0 {
            return Err(invalid("scan_interval_secs", "must be greater than 0"));
        }
        Ok(())
    }

    fn validate_optimizer(&self) -> Result<()> {
        let optimizer = &self.optimizer;
        if optimizer.interval_secs == 0 {
            return Err(invalid("optimizer.interval_secs", "must be greater than 0"));
        }
        let w = optimizer.weights;
        if [w.latency, w.reliability, w.health, w.load]
            .iter()
            .any(|v| v.is_nan() || *v < 0.0)
        {
            return Err(invalid("optimizer.weights", "weights must be 0 or greater"));
        }
        if w.sum() <= 0.0 {
            return Err(invalid("optimizer.weights", "weights must sum to more than 0"));
        }
        if optimizer.liquidity_reference_depth.is_nan() || optimizer.liquidity_reference_depth <= 0.0
        {
            return Err(invalid("liquidity_reference_depth", "must be greater than 0"));
        }
        if self.metrics.interval_secs == 0 {
            return Err(invalid("metrics.interval_secs", "must be greater than 0"));
        }
        if self.metrics.snapshot_interval_secs == 0 {
            return Err(invalid("snapshot_interval_secs", "must be greater than 0"));
        }
        Ok(())
    }

    fn validate_rules(&self) -> Result<()> {
        let known = self.venue_ids();
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(ConfigError::MissingField { field: "rules.id" }.into());
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(invalid("rules.id", format!("duplicate rule {}", rule.id)));
            }
            if let Some(venue) = rule.referenced_venues().into_iter().find(|v| !known.contains(*v)) {
                return Err(invalid(
                    "rules",
                    format!("rule {} references unknown venue {venue}", rule.id),
                ));
            }
        }
        Ok(())
    }

    fn venue_ids(&self) -> HashSet<VenueId> {
        self.venues.iter().map(VenueConfig::venue_id).collect()
    }

    /// Domain venue definitions in catalog order.
    #[must_use]
    pub fn catalog(&self) -> Vec<Venue> {
        self.venues.iter().map(VenueConfig::to_venue).collect()
    }

    /// Venues configured as disabled.
    #[must_use]
    pub fn disabled_venues(&self) -> Vec<VenueId> {
        self.venues
            .iter()
            .filter(|v| !v.enabled)
            .map(VenueConfig::venue_id)
            .collect()
    }

    #[must_use]
    pub fn routing_rules(&self) -> Vec<RoutingRule> {
        self.rules.iter().map(RuleConfig::to_rule).collect()
    }

    #[must_use]
    pub fn router_settings(&self) -> RouterSettings {
        RouterSettings {
            enabled: self.router.enabled,
            primary: VenueId::new(self.router.primary_venue.clone()),
            backups: self
                .router
                .backup_venues
                .iter()
                .map(|b| VenueId::new(b.clone()))
                .collect(),
            smart_routing: self.router.smart_routing,
            auto_failover: self.router.auto_failover,
            load_balancing: self.router.load_balancing,
            health: (&self.health).into(),
            failover: (&self.failover).into(),
            balancer: (&self.balancer).into(),
            optimizer: (&self.optimizer).into(),
            metrics: (&self.metrics).into(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
    .into()
}

fn unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::BalancingAlgorithm;
    use crate::domain::{ActionKind, Condition};
    use crate::error::Error;

    fn field_of(err: Error) -> &'static str {
        match err {
            Error::Config(ConfigError::InvalidValue { field, .. }) => field,
            Error::Config(ConfigError::MissingField { field }) => field,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.venues.len(), 3);
        assert_eq!(config.rules.len(), 3);
        assert_eq!(config.router.primary_venue, "binance");
        assert_eq!(config.health.check_interval_secs, 30);
        assert_eq!(config.balancer.algorithm, BalancingAlgorithm::Weighted);
        assert_eq!(config.failover.cooldown_secs, 300);
        assert_eq!(config.optimizer.interval_secs, 3600);
        assert_eq!(config.metrics.snapshot_interval_secs, 300);
    }

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn parses_sections_and_tagged_rules() {
        let toml = r#"
[logging]
level = "debug"
format = "json"

[router]
primary_venue = "alpha"
backup_venues = ["beta"]

[balancer]
algorithm = "round_robin"

[optimizer.weights]
latency = 0.5

[[venues]]
id = "alpha"
priority = 1
symbols = ["BTCUSDT"]
rest_api = { base_url = "https://alpha.example" }
fees = { maker = "0.0002", taker = "0.0006" }

[[venues]]
id = "beta"
priority = 2
enabled = false
symbols = ["BTCUSDT"]
rest_api = { base_url = "https://beta.example", timeout_ms = 2000 }

[[rules]]
id = "avoid_slow"
priority = 5
condition = { type = "venue_latency", operator = "greater_than", value_ms = 250.0 }
action = { type = "avoid", fallback = { type = "load_balance" } }
"#;
        let config = Config::parse_toml(toml).unwrap();
        assert_eq!(config.balancer.algorithm, BalancingAlgorithm::RoundRobin);
        assert_eq!(config.optimizer.weights.latency, 0.5);
        assert_eq!(config.optimizer.weights.load, 0.2);
        assert_eq!(config.disabled_venues(), vec![VenueId::new("beta")]);

        let catalog = config.catalog();
        assert_eq!(catalog[0].fees.scoring_rate().to_string(), "0.0006");
        assert_eq!(catalog[1].rest_api.timeout.as_millis(), 2000);

        let rules = config.routing_rules();
        assert_eq!(rules.len(), 1);
        assert!(matches!(rules[0].condition, Condition::VenueLatency { venue: None, .. }));
        assert_eq!(rules[0].action.kind, ActionKind::Avoid { venue: None });
        assert_eq!(
            rules[0].action.fallback.as_ref().map(|f| f.kind.clone()),
            Some(ActionKind::LoadBalance)
        );

        let settings = config.router_settings();
        assert_eq!(settings.primary, VenueId::new("alpha"));
        assert_eq!(settings.backups, vec![VenueId::new("beta")]);
    }

    #[test]
    fn rejects_unknown_primary() {
        let err = Config::parse_toml("[router]\nprimary_venue = \"kraken\"").unwrap_err();
        assert_eq!(field_of(err), "primary_venue");
    }

    #[test]
    fn rejects_bad_thresholds_and_intervals() {
        let mut config = Config::default();
        config.failover.recovery_threshold = 0.5;
        assert_eq!(field_of(config.validate().unwrap_err()), "recovery_threshold");

        let mut config = Config::default();
        config.health.check_interval_secs = 0;
        assert_eq!(field_of(config.validate().unwrap_err()), "check_interval_secs");

        let mut config = Config::default();
        config.health.threshold = 1.5;
        assert_eq!(field_of(config.validate().unwrap_err()), "health.threshold");
    }

    #[test]
    fn rejects_zero_weight_sum() {
        let toml = r#"
[optimizer.weights]
latency = 0.0
reliability = 0.0
health = 0.0
load = 0.0
"#;
        let err = Config::parse_toml(toml).unwrap_err();
        assert_eq!(field_of(err), "optimizer.weights");
    }

    #[test]
    fn rejects_duplicates_and_bad_urls() {
        let mut config = Config::default();
        config.venues.push(config.venues[0].clone());
        assert_eq!(field_of(config.validate().unwrap_err()), "venues.id");

        let mut config = Config::default();
        config.venues[1].rest_api.base_url = "not a url".into();
        assert_eq!(field_of(config.validate().unwrap_err()), "venues.rest_api");

        let mut config = Config::default();
        config.rules.push(config.rules[0].clone());
        assert_eq!(field_of(config.validate().unwrap_err()), "rules.id");
    }

    #[test]
    fn rejects_rules_naming_unknown_venues() {
        let toml = r#"
[router]
primary_venue = "alpha"
backup_venues = []

[[venues]]
id = "alpha"
rest_api = { base_url = "https://alpha.example" }
"#;
        // The default rules reference binance.
        let err = Config::parse_toml(toml).unwrap_err();
        assert_eq!(field_of(err), "rules");

        let config = Config::parse_toml(&format!("rules = []\n{toml}")).unwrap();
        assert!(config.rules.is_empty());
    }

    #[test]
    fn rejects_non_positive_capacity() {
        let mut config = Config::default();
        config.venues[0].capacity = 0.0;
        assert_eq!(field_of(config.validate().unwrap_err()), "venues.capacity");
    }
}
