//! Health monitor.
//!
//! Each cycle probes every enabled venue concurrently, scores the results,
//! appends a [`HealthCheck`] to the venue's capped history and publishes the
//! outcome into the registry. Routing never waits on a probe; it only reads
//! what the last cycle published.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::application::registry::VenueRegistry;
use crate::domain::{BoundedHistory, ConnectionState, HealthCheck, ProbeReport, Venue, VenueId};
use crate::error::RoutingError;
use crate::port::VenueProber;

/// Health history capacity per venue.
pub const HISTORY_CAPACITY: usize = 1_000;
/// Entries dropped at once when a venue's history overflows.
pub const HISTORY_TRIM: usize = 100;

/// Health monitor settings.
#[derive(Debug, Clone)]
pub struct HealthSettings {
    pub interval: Duration,
    pub probe_timeout: Duration,
    /// Minimum score for a check to count as healthy.
    pub threshold: f64,
    /// Number of recent checks used for availability and error rate.
    pub stats_window: usize,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            threshold: 0.8,
            stats_window: 100,
        }
    }
}

/// Rolling statistics over the most recent checks of one venue.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WindowStats {
    availability: f64,
    error_rate: f64,
}

/// Runs probe cycles and keeps per-venue health history.
pub struct HealthMonitor {
    registry: Arc<VenueRegistry>,
    prober: Arc<dyn VenueProber>,
    settings: HealthSettings,
    history: RwLock<HashMap<VenueId, BoundedHistory<HealthCheck>>>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<VenueRegistry>,
        prober: Arc<dyn VenueProber>,
        settings: HealthSettings,
    ) -> Self {
        let history = registry
            .venues()
            .iter()
            .map(|v| {
                (
                    v.id.clone(),
                    BoundedHistory::new(HISTORY_CAPACITY, HISTORY_TRIM),
                )
            })
            .collect();
        Self {
            registry,
            prober,
            settings,
            history: RwLock::new(history),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &HealthSettings {
        &self.settings
    }

    /// Probe every enabled venue once and publish the results.
    pub async fn run_cycle(&self) -> Vec<HealthCheck> {
        let venues = self.registry.enabled_venues();
        let checks = join_all(venues.iter().map(|v| self.check_venue(v))).await;

        let unhealthy = checks.iter().filter(|c| !c.healthy).count();
        debug!(
            venues = checks.len(),
            unhealthy,
            prober = self.prober.name(),
            "Health cycle complete"
        );
        checks
    }

    /// Probe one venue, record the check and update its status.
    pub async fn check_venue(&self, venue: &Venue) -> HealthCheck {
        let report = self.probe(venue).await;
        let check = HealthCheck::evaluate(
            venue.id.clone(),
            Utc::now(),
            report,
            self.settings.threshold,
        );
        let stats = self.record(check.clone());
        self.publish(&check, stats);
        check
    }

    async fn probe(&self, venue: &Venue) -> ProbeReport {
        let started = Instant::now();
        match tokio::time::timeout(self.settings.probe_timeout, self.prober.probe(venue)).await {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                warn!(venue = %venue.id, error = %e, "Venue probe failed");
                ProbeReport::all_failed(started.elapsed(), e.to_string())
            }
            Err(_) => {
                warn!(
                    venue = %venue.id,
                    timeout_ms = self.settings.probe_timeout.as_millis() as u64,
                    "Venue probe timed out"
                );
                ProbeReport::all_failed(self.settings.probe_timeout, "probe timed out")
            }
        }
    }

    fn record(&self, check: HealthCheck) -> WindowStats {
        let mut history = self.history.write();
        let entries = history
            .entry(check.venue.clone())
            .or_insert_with(|| BoundedHistory::new(HISTORY_CAPACITY, HISTORY_TRIM));
        entries.push(check);

        let window: Vec<&HealthCheck> = entries
            .iter()
            .rev()
            .take(self.settings.stats_window.max(1))
            .collect();
        let n = window.len() as f64;
        let healthy = window.iter().filter(|c| c.healthy).count() as f64;
        let failed: usize = window.iter().map(|c| c.report.failed_count()).sum();
        WindowStats {
            availability: healthy / n,
            error_rate: failed as f64 / (n * 4.0),
        }
    }

    fn publish(&self, check: &HealthCheck, stats: WindowStats) {
        let threshold = self.settings.threshold;
        let mut previous_state = None;
        let applied = self.registry.update_enabled(&check.venue, |status| {
            previous_state = Some(status.connection);
            let connected = check.report.connectivity.passed;

            status.health_score = check.health_score;
            status.latency = check.report.connectivity.duration;
            status.online = connected;
            status.connection = if !connected {
                ConnectionState::Disconnected
            } else if !check.healthy {
                ConnectionState::Error
            } else {
                ConnectionState::Connected
            };
            if check.healthy {
                status.consecutive_failures = 0;
            } else {
                status.consecutive_failures = status.consecutive_failures.saturating_add(1);
            }
            if let Some(depth) = check.report.book_depth {
                status.order_book_depth = depth;
            }
            status.availability = stats.availability;
            status.error_rate = stats.error_rate;
            status.last_ping = Some(check.timestamp);
        });

        match applied {
            Ok(true) => {}
            Ok(false) => {
                debug!(venue = %check.venue, "Venue disabled during probe, result not published");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Health check for unregistered venue");
                return;
            }
        }

        let was_connected = previous_state == Some(ConnectionState::Connected);
        if check.healthy && !was_connected {
            info!(venue = %check.venue, health = check.health_score, "Venue healthy");
        } else if !check.healthy && was_connected {
            warn!(
                venue = %check.venue,
                health = check.health_score,
                reason = %check.failure_reason(threshold).unwrap_or_default(),
                "Venue unhealthy"
            );
        } else {
            debug!(venue = %check.venue, health = check.health_score, "Health check");
        }
    }

    /// The `limit` most recent checks for `venue`, most recent last.
    ///
    /// A `limit` of zero returns the whole retained history.
    pub fn history(&self, venue: &VenueId, limit: usize) -> Result<Vec<HealthCheck>, RoutingError> {
        if !self.registry.contains(venue) {
            return Err(RoutingError::VenueNotFound {
                venue: venue.clone(),
            });
        }
        Ok(self
            .history
            .read()
            .get(venue)
            .map(|h| h.recent(limit))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{catalog, registry};
    use crate::testkit::prober::{self, ScriptedProber};

    fn monitor(prober: Arc<ScriptedProber>) -> (Arc<VenueRegistry>, HealthMonitor) {
        let registry = registry(catalog());
        let settings = HealthSettings {
            probe_timeout: Duration::from_millis(200),
            ..HealthSettings::default()
        };
        let monitor = HealthMonitor::new(registry.clone(), prober, settings);
        (registry, monitor)
    }

    #[tokio::test]
    async fn healthy_cycle_keeps_venues_connected() {
        let prober = Arc::new(ScriptedProber::healthy());
        let (registry, monitor) = monitor(prober);

        let checks = monitor.run_cycle().await;
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|c| c.healthy));

        let status = registry.get(&VenueId::new("binance")).unwrap();
        assert_eq!(status.connection, ConnectionState::Connected);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.health_score, 1.0);
        assert!(status.last_ping.is_some());
    }

    #[tokio::test]
    async fn failures_accumulate_and_reset() {
        let prober = Arc::new(ScriptedProber::healthy());
        let okx = VenueId::new("okx");
        prober.set(&okx, prober::failing_report());
        let (registry, monitor) = monitor(prober.clone());

        monitor.run_cycle().await;
        monitor.run_cycle().await;
        let status = registry.get(&okx).unwrap();
        assert_eq!(status.consecutive_failures, 2);
        assert_eq!(status.connection, ConnectionState::Disconnected);
        assert!(!status.online);
        assert_eq!(status.availability, 0.0);
        assert_eq!(status.error_rate, 1.0);

        prober.set(&okx, prober::healthy_report());
        monitor.run_cycle().await;
        let status = registry.get(&okx).unwrap();
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.connection, ConnectionState::Connected);
        assert!((status.availability - 1.0 / 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn slow_but_connected_venue_is_in_error_state() {
        let prober = Arc::new(ScriptedProber::healthy());
        let bybit = VenueId::new("bybit");
        prober.set(&bybit, prober::degraded_report());
        let (registry, monitor) = monitor(prober);

        let check = monitor.check_venue(registry.venue(&bybit).unwrap()).await;
        assert!(!check.healthy);
        assert_eq!(
            registry.get(&bybit).unwrap().connection,
            ConnectionState::Error
        );
    }

    #[tokio::test]
    async fn probe_timeout_counts_as_all_failed() {
        let prober = Arc::new(ScriptedProber::healthy());
        let binance = VenueId::new("binance");
        prober.set_delay(&binance, Duration::from_secs(5));
        let (registry, monitor) = monitor(prober);

        let check = monitor.check_venue(registry.venue(&binance).unwrap()).await;
        assert_eq!(check.health_score, 0.0);
        assert_eq!(check.report.failed_count(), 4);
        assert_eq!(check.report.connectivity.duration, Duration::from_millis(200));
    }

    #[tokio::test]
    async fn disabled_venues_are_not_probed() {
        let prober = Arc::new(ScriptedProber::healthy());
        let (registry, monitor) = monitor(prober.clone());
        registry.set_enabled(&VenueId::new("okx"), false).unwrap();

        let checks = monitor.run_cycle().await;
        assert_eq!(checks.len(), 2);
        assert_eq!(prober.probe_count(&VenueId::new("okx")), 0);
    }

    #[tokio::test]
    async fn history_is_ordered_and_limited() {
        let prober = Arc::new(ScriptedProber::healthy());
        let (_, monitor) = monitor(prober);
        for _ in 0..5 {
            monitor.run_cycle().await;
        }
        let binance = VenueId::new("binance");
        let recent = monitor.history(&binance, 3).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(monitor.history(&binance, 0).unwrap().len(), 5);
        assert!(monitor.history(&VenueId::new("kraken"), 1).is_err());
    }
}
