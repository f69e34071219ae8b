//! Venue scoring and periodic traffic-share optimisation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::application::balancer::LoadBalancer;
use crate::application::registry::VenueRegistry;
use crate::domain::{
    BoundedHistory, ComponentScores, OptimizationResult, ScoreWeights, VenueId, VenueShare,
    VenueSignals, VenueStatus,
};

/// Optimisation history capacity.
pub const HISTORY_CAPACITY: usize = 100;
/// Results dropped at once when the history overflows.
pub const HISTORY_TRIM: usize = 10;

/// Smallest weight the optimizer applies. A zero share would otherwise read
/// as the balancer's default weight.
const MIN_APPLIED_WEIGHT: f64 = 0.01;

/// Optimizer settings.
#[derive(Debug, Clone)]
pub struct OptimizerSettings {
    pub interval: Duration,
    pub weights: ScoreWeights,
    /// Order-book depth that counts as full liquidity.
    pub liquidity_reference_depth: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            weights: ScoreWeights::default(),
            liquidity_reference_depth: 10_000.0,
        }
    }
}

/// Scores candidates for single orders and recomputes traffic targets.
pub struct RoutingOptimizer {
    registry: Arc<VenueRegistry>,
    balancer: Arc<LoadBalancer>,
    settings: OptimizerSettings,
    history: RwLock<BoundedHistory<OptimizationResult>>,
}

impl RoutingOptimizer {
    pub fn new(
        registry: Arc<VenueRegistry>,
        balancer: Arc<LoadBalancer>,
        settings: OptimizerSettings,
    ) -> Self {
        Self {
            registry,
            balancer,
            settings,
            history: RwLock::new(BoundedHistory::new(HISTORY_CAPACITY, HISTORY_TRIM)),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &OptimizerSettings {
        &self.settings
    }

    /// Selection score of one venue.
    #[must_use]
    pub fn score(&self, status: &VenueStatus) -> f64 {
        self.settings.weights.score(status)
    }

    /// Highest-scoring candidate; ties keep list order.
    #[must_use]
    pub fn select_best(
        &self,
        candidates: &[VenueId],
        statuses: &HashMap<VenueId, VenueStatus>,
    ) -> Option<VenueId> {
        let mut best: Option<(&VenueId, f64)> = None;
        for id in candidates {
            let Some(status) = statuses.get(id) else {
                continue;
            };
            let score = self.score(status);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((id, score));
            }
        }
        best.map(|(id, score)| {
            debug!(venue = %id, score, "Scoring selected venue");
            id.clone()
        })
    }

    /// Recompute target shares for enabled venues and apply them as
    /// weighted-random weights (`share * venue count`).
    pub fn optimize(&self) -> OptimizationResult {
        let venues = self.registry.enabled_venues();
        let statuses = self.registry.statuses();

        let weights: Vec<f64> = venues.iter().map(|v| self.balancer.weight(&v.id)).collect();
        let weight_sum: f64 = weights.iter().sum();
        let previous = venues
            .iter()
            .zip(&weights)
            .map(|(v, w)| VenueShare {
                venue: v.id.clone(),
                share: if weight_sum > 0.0 { w / weight_sum } else { 0.0 },
            })
            .collect();

        let signals = venues
            .iter()
            .filter_map(|v| {
                let status = statuses.get(&v.id)?;
                let components = ComponentScores::for_status(
                    status,
                    v.fees.scoring_rate_f64(),
                    self.settings.liquidity_reference_depth,
                );
                Some(VenueSignals {
                    venue: v.id.clone(),
                    latency_ms: status.latency_ms(),
                    availability: status.availability,
                    health_score: status.health_score,
                    load_ratio: status.load_ratio().unwrap_or(0.0),
                    cost_score: components.cost,
                    liquidity_score: components.liquidity,
                    score: if status.is_routable() {
                        self.score(status)
                    } else {
                        0.0
                    },
                })
            })
            .collect();

        let result = OptimizationResult::new(previous, signals);
        let n = result.target.len() as f64;
        self.balancer.set_weights(
            result
                .target
                .iter()
                .map(|t| (t.venue.clone(), (t.share * n).max(MIN_APPLIED_WEIGHT))),
        );

        info!(
            venues = result.target.len(),
            shift = result.shift,
            "Routing weights optimised"
        );
        self.history.write().push(result.clone());
        result
    }

    #[must_use]
    pub fn history(&self) -> Vec<OptimizationResult> {
        self.history.read().to_vec()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::balancer::BalancingAlgorithm;
    use crate::testkit::domain::{catalog, registry, venue_id};

    fn optimizer() -> (Arc<VenueRegistry>, Arc<LoadBalancer>, RoutingOptimizer) {
        let registry = registry(catalog());
        let balancer = Arc::new(LoadBalancer::new(BalancingAlgorithm::Weighted));
        let optimizer = RoutingOptimizer::new(
            registry.clone(),
            balancer.clone(),
            OptimizerSettings::default(),
        );
        (registry, balancer, optimizer)
    }

    #[test]
    fn best_candidate_wins_and_ties_keep_order() {
        let (registry, _, optimizer) = optimizer();
        let candidates = vec![venue_id("binance"), venue_id("okx"), venue_id("bybit")];

        assert_eq!(
            optimizer.select_best(&candidates, &registry.statuses()),
            Some(venue_id("binance"))
        );

        registry
            .update(&venue_id("binance"), |s| s.latency = Duration::from_millis(400))
            .unwrap();
        assert_eq!(
            optimizer.select_best(&candidates, &registry.statuses()),
            Some(venue_id("okx"))
        );
        assert_eq!(optimizer.select_best(&[], &registry.statuses()), None);
    }

    #[test]
    fn optimize_applies_shares_as_weights() {
        let (registry, balancer, optimizer) = optimizer();
        registry
            .update(&venue_id("bybit"), |s| s.online = false)
            .unwrap();

        let result = optimizer.optimize();
        assert_eq!(result.target.len(), 3);
        assert_eq!(result.target_for(&venue_id("bybit")), Some(0.0));
        assert_eq!(result.target_for(&venue_id("binance")), Some(0.5));

        assert!((balancer.weight(&venue_id("binance")) - 1.5).abs() < 1e-12);
        assert_eq!(balancer.weight(&venue_id("bybit")), MIN_APPLIED_WEIGHT);
        assert_eq!(optimizer.history_len(), 1);
    }

    #[test]
    fn history_is_capped() {
        let (_, _, optimizer) = optimizer();
        for _ in 0..=HISTORY_CAPACITY {
            optimizer.optimize();
        }
        assert!(optimizer.history_len() <= HISTORY_CAPACITY);
    }
}
