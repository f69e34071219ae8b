//! Decision history, performance snapshots and the derived metrics.

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{
    BoundedHistory, FailoverEvent, PerformanceSnapshot, RoutingDecision, RoutingMetrics,
    VenuePerformance, VenueStatus,
};

/// Decision history capacity.
pub const DECISION_CAPACITY: usize = 10_000;
/// Decisions dropped at once when the history overflows.
pub const DECISION_TRIM: usize = 1_000;
/// Performance snapshot capacity.
pub const SNAPSHOT_CAPACITY: usize = 1_000;
/// Snapshots dropped at once when the history overflows.
pub const SNAPSHOT_TRIM: usize = 100;

/// Owns the routing histories and the last computed [`RoutingMetrics`].
pub struct MetricsCollector {
    decisions: RwLock<BoundedHistory<RoutingDecision>>,
    snapshots: RwLock<BoundedHistory<PerformanceSnapshot>>,
    metrics: RwLock<RoutingMetrics>,
    /// Fee rate savings are measured against.
    primary_fee_rate: Decimal,
}

impl MetricsCollector {
    #[must_use]
    pub fn new(primary_fee_rate: Decimal) -> Self {
        Self {
            decisions: RwLock::new(BoundedHistory::new(DECISION_CAPACITY, DECISION_TRIM)),
            snapshots: RwLock::new(BoundedHistory::new(SNAPSHOT_CAPACITY, SNAPSHOT_TRIM)),
            metrics: RwLock::new(RoutingMetrics::default()),
            primary_fee_rate,
        }
    }

    pub fn record_decision(&self, decision: RoutingDecision) {
        self.decisions.write().push(decision);
    }

    /// The `limit` most recent decisions, oldest first. Zero means all.
    #[must_use]
    pub fn decisions(&self, limit: usize) -> Vec<RoutingDecision> {
        self.decisions.read().recent(limit)
    }

    #[must_use]
    pub fn decision_count(&self) -> usize {
        self.decisions.read().len()
    }

    /// Recompute metrics from the decision history and `failovers`.
    pub fn refresh(&self, failovers: &[FailoverEvent]) -> RoutingMetrics {
        let metrics = {
            let decisions = self.decisions.read();
            RoutingMetrics::compute(decisions.iter(), failovers, self.primary_fee_rate)
        };
        debug!(
            decisions = metrics.total_decisions,
            success_rate = metrics.success_rate,
            p95_ms = metrics.p95_latency_ms,
            "Routing metrics refreshed"
        );
        *self.metrics.write() = metrics.clone();
        metrics
    }

    /// Copy of the last computed metrics.
    #[must_use]
    pub fn metrics(&self) -> RoutingMetrics {
        self.metrics.read().clone()
    }

    /// Record a performance snapshot of `statuses`.
    pub fn capture_snapshot(
        &self,
        statuses: &[VenueStatus],
        failovers_last_hour: u64,
    ) -> PerformanceSnapshot {
        let (venues, route_quality) = {
            let decisions = self.decisions.read();
            let venues: Vec<VenuePerformance> = statuses
                .iter()
                .map(|status| {
                    let (total, ok) = decisions
                        .iter()
                        .filter(|d| d.selected_venue.as_ref() == Some(&status.venue))
                        .fold((0u64, 0u64), |(t, s), d| (t + 1, s + u64::from(d.success)));
                    VenuePerformance {
                        venue: status.venue.clone(),
                        latency: status.latency,
                        availability: status.availability,
                        utilization: status.load_ratio().unwrap_or(0.0),
                        error_rate: status.error_rate,
                        health_score: status.health_score,
                        order_success_rate: if total > 0 {
                            ok as f64 / total as f64
                        } else {
                            0.0
                        },
                    }
                })
                .collect();

            let scores: Vec<f64> = decisions
                .iter()
                .filter(|d| d.success)
                .map(|d| d.overall_score)
                .collect();
            let quality = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };
            (venues, quality)
        };

        let system_load = if venues.is_empty() {
            0.0
        } else {
            venues.iter().map(|v| v.utilization).sum::<f64>() / venues.len() as f64
        };

        let snapshot = PerformanceSnapshot {
            timestamp: chrono::Utc::now(),
            venues,
            route_quality,
            system_load,
            failovers_last_hour,
        };
        self.snapshots.write().push(snapshot.clone());
        snapshot
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<PerformanceSnapshot> {
        self.snapshots.read().to_vec()
    }

    #[must_use]
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.read().len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::{ComponentScores, OrderId, SelectionSource, VenueId};

    fn decision(venue: &str, success: bool) -> RoutingDecision {
        let mut d = RoutingDecision::routed(
            OrderId::new("o"),
            "BTCUSDT",
            "LIMIT",
            VenueId::new(venue),
            SelectionSource::LoadBalancer,
            ComponentScores {
                latency: 0.8,
                reliability: 0.6,
                cost: 1.0,
                liquidity: 0.4,
            },
        );
        d.success = success;
        d.actual_latency = Some(Duration::from_millis(100));
        d.actual_cost = Some(dec!(0.001));
        d
    }

    #[test]
    fn decision_history_is_bounded() {
        let collector = MetricsCollector::new(dec!(0.001));
        for _ in 0..=DECISION_CAPACITY {
            collector.record_decision(decision("binance", true));
        }
        assert!(collector.decision_count() <= DECISION_CAPACITY - DECISION_TRIM + 1);
    }

    #[test]
    fn refresh_replaces_metrics() {
        let collector = MetricsCollector::new(dec!(0.001));
        assert_eq!(collector.metrics().total_decisions, 0);

        collector.record_decision(decision("binance", true));
        collector.record_decision(decision("okx", false));
        let metrics = collector.refresh(&[]);
        assert_eq!(metrics.total_decisions, 2);
        assert_eq!(collector.metrics(), metrics);
        assert_eq!(metrics.route_quality, 0.7);
    }

    #[test]
    fn snapshot_reports_per_venue_success() {
        let collector = MetricsCollector::new(dec!(0.001));
        collector.record_decision(decision("binance", true));
        collector.record_decision(decision("binance", false));

        let mut status = VenueStatus::initial(VenueId::new("binance"), 100.0);
        status.current_load = 50.0;
        let snapshot = collector.capture_snapshot(&[status], 2);

        assert_eq!(snapshot.venues[0].order_success_rate, 0.5);
        assert_eq!(snapshot.venues[0].utilization, 0.5);
        assert_eq!(snapshot.system_load, 0.5);
        assert_eq!(snapshot.failovers_last_hour, 2);
        assert_eq!(collector.snapshot_count(), 1);
    }
}
