//! Canonical test configurations.
//!
//! Single source of truth for router settings and configs used across tests.
//! Intervals are short so lifecycle tests finish quickly.

use std::sync::Arc;
use std::time::Duration;

use crate::application::{Collaborators, RouterSettings};
use crate::infrastructure::config::Config;
use crate::testkit::domain::venue_id;
use crate::testkit::executor::{RecordingExecutor, RecordingFailoverExecutor};
use crate::testkit::prober::ScriptedProber;

/// Router settings for the binance/okx/bybit catalog with millisecond cadences.
pub fn fast_settings() -> RouterSettings {
    let mut settings = RouterSettings::new("binance", vec![venue_id("okx"), venue_id("bybit")]);
    settings.health.interval = Duration::from_millis(10);
    settings.health.probe_timeout = Duration::from_millis(200);
    settings.balancer.rebalance_interval = Duration::from_millis(10);
    settings.failover.scan_interval = Duration::from_millis(10);
    settings.failover.cooldown = Duration::ZERO;
    settings.optimizer.interval = Duration::from_millis(10);
    settings.metrics.interval = Duration::from_millis(10);
    settings.metrics.snapshot_interval = Duration::from_millis(10);
    settings
}

/// Default configuration with one-second cadences and no failover cooldown.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.health.check_interval_secs = 1;
    config.balancer.rebalance_interval_secs = 1;
    config.failover.scan_interval_secs = 1;
    config.failover.cooldown_secs = 0;
    config.optimizer.interval_secs = 1;
    config.metrics.interval_secs = 1;
    config.metrics.snapshot_interval_secs = 1;
    config
}

/// Handles onto the scripted collaborators a router was built with.
#[derive(Clone)]
pub struct Rig {
    pub prober: Arc<ScriptedProber>,
    pub executor: Arc<RecordingExecutor>,
    pub failover: Arc<RecordingFailoverExecutor>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_failover(RecordingFailoverExecutor::new())
    }

    pub fn with_failover(failover: RecordingFailoverExecutor) -> Self {
        Self {
            prober: Arc::new(ScriptedProber::healthy()),
            executor: Arc::new(RecordingExecutor::new()),
            failover: Arc::new(failover),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            prober: self.prober.clone(),
            executor: self.executor.clone(),
            failover: self.failover.clone(),
        }
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

/// Scripted collaborators plus the handles to script and inspect them.
pub fn fast_collaborators() -> (Collaborators, Rig) {
    let rig = Rig::new();
    (rig.collaborators(), rig)
}
