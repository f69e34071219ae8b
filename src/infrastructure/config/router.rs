//! Router, health, balancer, failover, optimizer and metrics sections.

use std::time::Duration;

use serde::Deserialize;

use crate::application::{
    BalancerSettings, BalancingAlgorithm, FailoverSettings, HealthSettings, MetricsSettings,
    OptimizerSettings, RebalanceSettings,
};
use crate::domain::{FailoverLimits, ScoreWeights};

/// `[router]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_primary_venue")]
    pub primary_venue: String,
    #[serde(default = "default_backup_venues")]
    pub backup_venues: Vec<String>,
    /// Rank candidates by score before falling back to the balancer.
    #[serde(default = "default_true")]
    pub smart_routing: bool,
    /// Run the periodic failover scan.
    #[serde(default = "default_true")]
    pub auto_failover: bool,
    #[serde(default = "default_true")]
    pub load_balancing: bool,
}

const fn default_true() -> bool {
    true
}

fn default_primary_venue() -> String {
    "binance".into()
}

fn default_backup_venues() -> Vec<String> {
    vec!["okx".into(), "bybit".into()]
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            primary_venue: default_primary_venue(),
            backup_venues: default_backup_venues(),
            smart_routing: true,
            auto_failover: true,
            load_balancing: true,
        }
    }
}

/// `[health]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Minimum score for a check to count as healthy.
    #[serde(default = "default_health_threshold")]
    pub threshold: f64,
    /// Checks used for availability and error rate.
    #[serde(default = "default_stats_window")]
    pub stats_window: usize,
}

const fn default_check_interval_secs() -> u64 {
    30
}

const fn default_probe_timeout_ms() -> u64 {
    10_000
}

const fn default_health_threshold() -> f64 {
    0.8
}

const fn default_stats_window() -> usize {
    100
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval_secs(),
            probe_timeout_ms: default_probe_timeout_ms(),
            threshold: default_health_threshold(),
            stats_window: default_stats_window(),
        }
    }
}

impl From<&HealthConfig> for HealthSettings {
    fn from(config: &HealthConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.check_interval_secs),
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            threshold: config.threshold,
            stats_window: config.stats_window,
        }
    }
}

/// `[balancer]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BalancerConfig {
    #[serde(default)]
    pub algorithm: BalancingAlgorithm,
    #[serde(default = "default_rebalance_interval_secs")]
    pub rebalance_interval_secs: u64,
    #[serde(default = "default_rebalance_tolerance")]
    pub rebalance_tolerance: f64,
    #[serde(default = "default_adjustment_rate")]
    pub adjustment_rate: f64,
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
}

const fn default_rebalance_interval_secs() -> u64 {
    60
}

const fn default_rebalance_tolerance() -> f64 {
    0.1
}

const fn default_adjustment_rate() -> f64 {
    0.1
}

const fn default_min_weight() -> f64 {
    0.1
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            algorithm: BalancingAlgorithm::default(),
            rebalance_interval_secs: default_rebalance_interval_secs(),
            rebalance_tolerance: default_rebalance_tolerance(),
            adjustment_rate: default_adjustment_rate(),
            min_weight: default_min_weight(),
        }
    }
}

impl From<&BalancerConfig> for BalancerSettings {
    fn from(config: &BalancerConfig) -> Self {
        Self {
            algorithm: config.algorithm,
            rebalance_interval: Duration::from_secs(config.rebalance_interval_secs),
            rebalance: RebalanceSettings {
                tolerance: config.rebalance_tolerance,
                adjustment_rate: config.adjustment_rate,
                min_weight: config.min_weight,
            },
        }
    }
}

/// `[failover]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FailoverConfig {
    /// Health below this triggers a failover.
    #[serde(default = "default_failover_health_threshold")]
    pub health_threshold: f64,
    /// Health at or above this reinstates a failed-away venue.
    #[serde(default = "default_recovery_threshold")]
    pub recovery_threshold: f64,
    /// Cap on successful failovers over the process lifetime.
    #[serde(default = "default_max_failovers")]
    pub max_failovers: u32,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_consecutive_failure_limit")]
    pub consecutive_failure_limit: u32,
    #[serde(default = "default_error_rate_limit")]
    pub error_rate_limit: f64,
    /// Latency above twice this triggers a failover.
    #[serde(default = "default_latency_threshold_ms")]
    pub latency_threshold_ms: u64,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
}

const fn default_failover_health_threshold() -> f64 {
    0.8
}

const fn default_recovery_threshold() -> f64 {
    0.9
}

const fn default_max_failovers() -> u32 {
    5
}

const fn default_cooldown_secs() -> u64 {
    300
}

const fn default_consecutive_failure_limit() -> u32 {
    3
}

const fn default_error_rate_limit() -> f64 {
    0.1
}

const fn default_latency_threshold_ms() -> u64 {
    100
}

const fn default_scan_interval_secs() -> u64 {
    10
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            health_threshold: default_failover_health_threshold(),
            recovery_threshold: default_recovery_threshold(),
            max_failovers: default_max_failovers(),
            cooldown_secs: default_cooldown_secs(),
            consecutive_failure_limit: default_consecutive_failure_limit(),
            error_rate_limit: default_error_rate_limit(),
            latency_threshold_ms: default_latency_threshold_ms(),
            scan_interval_secs: default_scan_interval_secs(),
        }
    }
}

impl From<&FailoverConfig> for FailoverSettings {
    fn from(config: &FailoverConfig) -> Self {
        Self {
            limits: FailoverLimits {
                health_threshold: config.health_threshold,
                recovery_threshold: config.recovery_threshold,
                consecutive_failures: config.consecutive_failure_limit,
                latency_threshold: Duration::from_millis(config.latency_threshold_ms),
                error_rate: config.error_rate_limit,
            },
            max_failovers: config.max_failovers,
            cooldown: Duration::from_secs(config.cooldown_secs),
            scan_interval: Duration::from_secs(config.scan_interval_secs),
        }
    }
}

/// `[optimizer]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizerConfig {
    #[serde(default = "default_optimizer_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub weights: ScoreWeights,
    /// Order-book depth that scores as full liquidity.
    #[serde(default = "default_liquidity_reference_depth")]
    pub liquidity_reference_depth: f64,
}

const fn default_optimizer_interval_secs() -> u64 {
    3600
}

const fn default_liquidity_reference_depth() -> f64 {
    10_000.0
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_optimizer_interval_secs(),
            weights: ScoreWeights::default(),
            liquidity_reference_depth: default_liquidity_reference_depth(),
        }
    }
}

impl From<&OptimizerConfig> for OptimizerSettings {
    fn from(config: &OptimizerConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            weights: config.weights,
            liquidity_reference_depth: config.liquidity_reference_depth,
        }
    }
}

/// `[metrics]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,
}

const fn default_metrics_interval_secs() -> u64 {
    30
}

const fn default_snapshot_interval_secs() -> u64 {
    300
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_metrics_interval_secs(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
        }
    }
}

impl From<&MetricsConfig> for MetricsSettings {
    fn from(config: &MetricsConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_secs),
            snapshot_interval: Duration::from_secs(config.snapshot_interval_secs),
        }
    }
}
