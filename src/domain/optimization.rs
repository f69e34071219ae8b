//! Traffic-share optimisation results.
//!
//! The optimizer turns per-venue signals into a target share of traffic,
//! proportional to each venue's weighted score. Shares are kept as ordered
//! vectors so they follow catalog order when logged or serialised.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::VenueId;

/// One venue's share of routed traffic, in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueShare {
    pub venue: VenueId,
    pub share: f64,
}

/// Signals that justified a venue's new share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSignals {
    pub venue: VenueId,
    pub latency_ms: f64,
    pub availability: f64,
    pub health_score: f64,
    pub load_ratio: f64,
    pub cost_score: f64,
    pub liquidity_score: f64,
    /// Weighted selection score the share was derived from.
    pub score: f64,
}

/// Periodic snapshot of the previous and newly computed traffic distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub timestamp: DateTime<Utc>,
    pub previous: Vec<VenueShare>,
    pub target: Vec<VenueShare>,
    pub signals: Vec<VenueSignals>,
    /// Fraction of traffic moved between venues, in `[0, 1]`.
    pub shift: f64,
}

impl OptimizationResult {
    #[must_use]
    pub fn new(previous: Vec<VenueShare>, signals: Vec<VenueSignals>) -> Self {
        let target = target_shares(&signals);
        let shift = traffic_shift(&previous, &target);
        Self {
            timestamp: Utc::now(),
            previous,
            target,
            signals,
            shift,
        }
    }

    #[must_use]
    pub fn target_for(&self, venue: &VenueId) -> Option<f64> {
        self.target
            .iter()
            .find(|s| &s.venue == venue)
            .map(|s| s.share)
    }
}

/// Shares proportional to score. When every score is zero, traffic is split
/// evenly.
#[must_use]
pub fn target_shares(signals: &[VenueSignals]) -> Vec<VenueShare> {
    let total: f64 = signals.iter().map(|s| s.score.max(0.0)).sum();
    let even = if signals.is_empty() {
        0.0
    } else {
        1.0 / signals.len() as f64
    };
    signals
        .iter()
        .map(|s| VenueShare {
            venue: s.venue.clone(),
            share: if total > 0.0 {
                s.score.max(0.0) / total
            } else {
                even
            },
        })
        .collect()
}

/// Half the L1 distance between two distributions.
fn traffic_shift(previous: &[VenueShare], target: &[VenueShare]) -> f64 {
    let moved: f64 = target
        .iter()
        .map(|t| {
            let before = previous
                .iter()
                .find(|p| p.venue == t.venue)
                .map_or(0.0, |p| p.share);
            (t.share - before).abs()
        })
        .sum();
    moved / 2.0
}
