//! Load balancer.
//!
//! Picks one venue from a candidate list using round-robin, weighted-random
//! or least-active-connections. Candidate lists are expected in catalog
//! order; round-robin cycling and every tie-break follow that order.
//!
//! The balancer also owns the per-venue in-flight counters. Callers hold a
//! [`ConnectionGuard`] for the duration of an execution so the counter is
//! released even if the execution future is dropped.

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::VenueId;

/// Weight used for venues without an explicit positive weight.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Selection discipline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalancingAlgorithm {
    RoundRobin,
    #[default]
    Weighted,
    LeastConnections,
}

/// Rebalance tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RebalanceSettings {
    /// Share deviation tolerated before a weight is nudged.
    pub tolerance: f64,
    /// Fraction of the deviation applied per rebalance.
    pub adjustment_rate: f64,
    /// Floor for adjusted weights.
    pub min_weight: f64,
}

impl Default for RebalanceSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            adjustment_rate: 0.1,
            min_weight: 0.1,
        }
    }
}

/// One weight change made by [`LoadBalancer::rebalance`].
#[derive(Debug, Clone, PartialEq)]
pub struct WeightAdjustment {
    pub venue: VenueId,
    pub current_share: f64,
    pub ideal_share: f64,
    pub old_weight: f64,
    pub new_weight: f64,
}

#[derive(Debug, Default)]
struct BalancerState {
    last_selected: Option<VenueId>,
    weights: HashMap<VenueId, f64>,
    active: HashMap<VenueId, u64>,
}

impl BalancerState {
    fn weight(&self, venue: &VenueId) -> f64 {
        self.weights
            .get(venue)
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_WEIGHT)
    }
}

/// Venue selector with in-flight accounting.
pub struct LoadBalancer {
    algorithm: BalancingAlgorithm,
    state: Mutex<BalancerState>,
}

impl LoadBalancer {
    #[must_use]
    pub fn new(algorithm: BalancingAlgorithm) -> Self {
        Self {
            algorithm,
            state: Mutex::new(BalancerState::default()),
        }
    }

    /// Seed weights, e.g. `1 / priority` per venue.
    #[must_use]
    pub fn with_weights<I>(self, weights: I) -> Self
    where
        I: IntoIterator<Item = (VenueId, f64)>,
    {
        self.set_weights(weights);
        self
    }

    #[must_use]
    pub fn algorithm(&self) -> BalancingAlgorithm {
        self.algorithm
    }

    /// Pick one candidate. `None` only for an empty list.
    pub fn select(&self, candidates: &[VenueId]) -> Option<VenueId> {
        self.select_with(candidates, &mut rand::thread_rng())
    }

    /// Pick one candidate drawing randomness from `rng`.
    pub fn select_with<R: Rng>(
        &self,
        candidates: &[VenueId],
        rng: &mut R,
    ) -> Option<VenueId> {
        if candidates.is_empty() {
            return None;
        }
        let mut state = self.state.lock();
        let selected = match self.algorithm {
            BalancingAlgorithm::RoundRobin => round_robin(&state, candidates),
            BalancingAlgorithm::Weighted => weighted(&state, candidates, rng),
            BalancingAlgorithm::LeastConnections => least_connections(&state, candidates),
        }
        .clone();
        state.last_selected = Some(selected.clone());
        debug!(venue = %selected, algorithm = ?self.algorithm, "Load balancer selected venue");
        Some(selected)
    }

    /// Count an in-flight order at `venue` until the guard drops.
    pub fn acquire(&self, venue: &VenueId) -> ConnectionGuard<'_> {
        *self.state.lock().active.entry(venue.clone()).or_insert(0) += 1;
        ConnectionGuard {
            balancer: self,
            venue: venue.clone(),
        }
    }

    fn release(&self, venue: &VenueId) {
        let mut state = self.state.lock();
        if let Some(count) = state.active.get_mut(venue) {
            *count = count.saturating_sub(1);
        }
    }

    #[must_use]
    pub fn active_connections(&self, venue: &VenueId) -> u64 {
        self.state.lock().active.get(venue).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn active_snapshot(&self) -> HashMap<VenueId, u64> {
        self.state.lock().active.clone()
    }

    /// Effective weight of `venue` (unset or non-positive weights read as 1.0).
    #[must_use]
    pub fn weight(&self, venue: &VenueId) -> f64 {
        self.state.lock().weight(venue)
    }

    #[must_use]
    pub fn weights(&self) -> HashMap<VenueId, f64> {
        self.state.lock().weights.clone()
    }

    pub fn set_weight(&self, venue: VenueId, weight: f64) {
        self.state.lock().weights.insert(venue, weight);
    }

    pub fn set_weights<I>(&self, weights: I)
    where
        I: IntoIterator<Item = (VenueId, f64)>,
    {
        let mut state = self.state.lock();
        for (venue, weight) in weights {
            state.weights.insert(venue, weight);
        }
    }

    /// Nudge weights toward each venue's share of total capacity.
    ///
    /// Current share is the venue's fraction of all in-flight orders. Venues
    /// whose share deviates from the ideal by more than the tolerance move by
    /// `rate * deviation`, never below the floor. With nothing in flight there
    /// is nothing to compare and no weight changes.
    pub fn rebalance(
        &self,
        capacities: &[(VenueId, f64)],
        settings: RebalanceSettings,
    ) -> Vec<WeightAdjustment> {
        let total_capacity: f64 = capacities.iter().map(|(_, c)| c.max(0.0)).sum();
        if total_capacity <= 0.0 {
            return Vec::new();
        }

        let mut state = self.state.lock();
        let total_active: u64 = capacities
            .iter()
            .map(|(v, _)| state.active.get(v).copied().unwrap_or(0))
            .sum();
        if total_active == 0 {
            return Vec::new();
        }

        let mut adjustments = Vec::new();
        for (venue, capacity) in capacities {
            let ideal_share = capacity.max(0.0) / total_capacity;
            let current_share =
                state.active.get(venue).copied().unwrap_or(0) as f64 / total_active as f64;
            let deviation = ideal_share - current_share;
            if deviation.abs() <= settings.tolerance {
                continue;
            }
            let old_weight = state.weight(venue);
            let new_weight = (old_weight + deviation * settings.adjustment_rate).max(settings.min_weight);
            state.weights.insert(venue.clone(), new_weight);
            adjustments.push(WeightAdjustment {
                venue: venue.clone(),
                current_share,
                ideal_share,
                old_weight,
                new_weight,
            });
        }
        adjustments
    }
}

/// Releases one in-flight slot on drop.
#[must_use = "the in-flight count is released when the guard drops"]
pub struct ConnectionGuard<'a> {
    balancer: &'a LoadBalancer,
    venue: VenueId,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.balancer.release(&self.venue);
    }
}

fn round_robin<'a>(state: &BalancerState, candidates: &'a [VenueId]) -> &'a VenueId {
    let next = state
        .last_selected
        .as_ref()
        .and_then(|last| candidates.iter().position(|c| c == last))
        .map_or(0, |i| (i + 1) % candidates.len());
    &candidates[next]
}

fn weighted<'a, R: Rng>(
    state: &BalancerState,
    candidates: &'a [VenueId],
    rng: &mut R,
) -> &'a VenueId {
    let weights: Vec<f64> = candidates.iter().map(|c| state.weight(c)).collect();
    let total: f64 = weights.iter().sum();
    let draw = rng.gen::<f64>() * total;

    let mut cumulative = 0.0;
    for (candidate, weight) in candidates.iter().zip(&weights) {
        cumulative += weight;
        if draw < cumulative {
            return candidate;
        }
    }
    // Only reachable through float rounding at the top of the range.
    &candidates[candidates.len() - 1]
}

fn least_connections<'a>(state: &BalancerState, candidates: &'a [VenueId]) -> &'a VenueId {
    candidates
        .iter()
        .min_by_key(|c| state.active.get(*c).copied().unwrap_or(0))
        .unwrap_or(&candidates[0])
}
