//! Aggregated routing metrics and performance snapshots.
//!
//! Everything here is derived. [`RoutingMetrics::compute`] rebuilds the whole
//! aggregate from the decision and failover histories; nothing increments a
//! metric in place.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::decision::RoutingDecision;
use super::failover::FailoverEvent;
use super::id::VenueId;

/// Value at percentile `p` (0.0 to 1.0) of a sorted sample.
///
/// Uses the nearest-rank index `round((n - 1) * p)`; an empty sample yields
/// zero.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Per-venue routing statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueRoutingStats {
    pub orders: u64,
    /// Fraction of all routed decisions that landed here.
    pub share: f64,
    pub success_rate: f64,
    pub average_latency_ms: f64,
}

/// Rolling routing aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingMetrics {
    pub total_decisions: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub venues: BTreeMap<VenueId, VenueRoutingStats>,
    pub failover_count: u64,
    pub average_failover_ms: f64,
    pub auto_recovery_rate: f64,
    pub total_cost: Decimal,
    pub average_cost: Decimal,
    /// Cost saved against routing every successful order at the primary
    /// venue's fee rate.
    pub cost_savings: Decimal,
    /// Mean overall score of successful decisions.
    pub route_quality: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RoutingMetrics {
    /// Rebuild the aggregate from histories.
    #[must_use]
    pub fn compute<'a, D, F>(decisions: D, failovers: F, primary_fee_rate: Decimal) -> Self
    where
        D: IntoIterator<Item = &'a RoutingDecision>,
        F: IntoIterator<Item = &'a FailoverEvent>,
    {
        let mut metrics = Self::default();
        let mut latencies = Vec::new();
        let mut quality = Vec::new();
        let mut per_venue: BTreeMap<VenueId, (u64, u64, Vec<f64>)> = BTreeMap::new();
        let mut routed = 0u64;

        for decision in decisions {
            metrics.total_decisions += 1;
            if decision.success {
                metrics.successful += 1;
                quality.push(decision.overall_score);
            } else {
                metrics.failed += 1;
            }

            let latency = decision.actual_latency_ms();
            if let Some(ms) = latency {
                latencies.push(ms);
            }

            if let Some(cost) = decision.actual_cost {
                metrics.total_cost += cost;
                if decision.success {
                    metrics.cost_savings += primary_fee_rate - cost;
                }
            }

            if let Some(venue) = &decision.selected_venue {
                routed += 1;
                let entry = per_venue.entry(venue.clone()).or_default();
                entry.0 += 1;
                if decision.success {
                    entry.1 += 1;
                }
                entry.2.extend(latency);
            }
        }

        if metrics.total_decisions > 0 {
            metrics.success_rate = metrics.successful as f64 / metrics.total_decisions as f64;
            metrics.average_cost = metrics.total_cost / Decimal::from(metrics.total_decisions);
        }

        latencies.sort_by(f64::total_cmp);
        metrics.average_latency_ms = mean(&latencies);
        metrics.p95_latency_ms = percentile(&latencies, 0.95);
        metrics.p99_latency_ms = percentile(&latencies, 0.99);
        metrics.route_quality = mean(&quality);

        metrics.venues = per_venue
            .into_iter()
            .map(|(venue, (orders, ok, lat))| {
                let stats = VenueRoutingStats {
                    orders,
                    share: orders as f64 / routed as f64,
                    success_rate: ok as f64 / orders as f64,
                    average_latency_ms: mean(&lat),
                };
                (venue, stats)
            })
            .collect();

        let mut durations = Vec::new();
        let mut recovered = 0u64;
        for event in failovers {
            metrics.failover_count += 1;
            durations.push(event.duration.as_micros() as f64 / 1000.0);
            if event.auto_recovery {
                recovered += 1;
            }
        }
        metrics.average_failover_ms = mean(&durations);
        if metrics.failover_count > 0 {
            metrics.auto_recovery_rate = recovered as f64 / metrics.failover_count as f64;
        }

        metrics.last_updated = Some(Utc::now());
        metrics
    }
}

/// Point-in-time performance of one venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenuePerformance {
    pub venue: VenueId,
    pub latency: Duration,
    pub availability: f64,
    pub utilization: f64,
    pub error_rate: f64,
    pub health_score: f64,
    /// Success rate of decisions routed to this venue.
    pub order_success_rate: f64,
}

/// Periodic snapshot of venue and router performance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub venues: Vec<VenuePerformance>,
    pub route_quality: f64,
    /// Mean utilisation across venues.
    pub system_load: f64,
    pub failovers_last_hour: u64,
}
