//! Venue scoring.
//!
//! Two kinds of score live here: the selection score used to rank candidates
//! for a single order, and the component scores recorded on a routing
//! decision.

use serde::{Deserialize, Serialize};

use super::status::VenueStatus;

/// Latency component: `1 - min(ms / 1000, 1)`.
#[must_use]
pub fn latency_component(status: &VenueStatus) -> f64 {
    1.0 - (status.latency_ms() / 1000.0).min(1.0)
}

/// Inverse load component: `1 - load / limit`, clamped to `[0, 1]`.
#[must_use]
pub fn load_component(status: &VenueStatus) -> f64 {
    status
        .load_ratio()
        .map_or(0.0, |ratio| (1.0 - ratio).clamp(0.0, 1.0))
}

/// Weights for the candidate selection score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub latency: f64,
    pub reliability: f64,
    pub health: f64,
    pub load: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            latency: 0.3,
            reliability: 0.25,
            health: 0.25,
            load: 0.2,
        }
    }
}

impl ScoreWeights {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.latency + self.reliability + self.health + self.load
    }

    /// Weighted score of a venue, normalised by the weight sum so the result
    /// stays in `[0, 1]`.
    #[must_use]
    pub fn score(&self, status: &VenueStatus) -> f64 {
        let total = self.sum();
        if total <= 0.0 {
            return 0.0;
        }
        let weighted = latency_component(status) * self.latency
            + status.availability * self.reliability
            + status.health_score * self.health
            + load_component(status) * self.load;
        weighted / total
    }
}

/// Per-decision component scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub latency: f64,
    pub reliability: f64,
    pub cost: f64,
    pub liquidity: f64,
}

impl ComponentScores {
    /// Score the venue a decision landed on.
    ///
    /// `fee_rate` is the venue's scoring fee; `reference_depth` is the depth
    /// that counts as full liquidity.
    #[must_use]
    pub fn for_status(status: &VenueStatus, fee_rate: f64, reference_depth: f64) -> Self {
        let liquidity = if reference_depth > 0.0 {
            (status.order_book_depth / reference_depth).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            latency: latency_component(status),
            reliability: status.health_score,
            cost: (1.0 - fee_rate * 10.0).clamp(0.0, 1.0),
            liquidity,
        }
    }

    /// Arithmetic mean of the four components.
    #[must_use]
    pub fn overall(&self) -> f64 {
        (self.latency + self.reliability + self.cost + self.liquidity) / 4.0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::id::VenueId;

    fn status() -> VenueStatus {
        VenueStatus::initial(VenueId::new("binance"), 100.0)
    }

    #[test]
    fn overall_is_exact_mean() {
        let scores = ComponentScores {
            latency: 0.8,
            reliability: 0.6,
            cost: 1.0,
            liquidity: 0.4,
        };
        assert_eq!(scores.overall(), 0.7);
    }

    #[test]
    fn latency_component_saturates_at_one_second() {
        let mut s = status();
        s.latency = Duration::from_millis(250);
        assert_eq!(latency_component(&s), 0.75);
        s.latency = Duration::from_secs(3);
        assert_eq!(latency_component(&s), 0.0);
    }

    #[test]
    fn perfect_venue_scores_one() {
        let weights = ScoreWeights::default();
        assert!((weights.score(&status()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn loaded_venue_scores_lower() {
        let weights = ScoreWeights::default();
        let idle = status();
        let mut busy = status();
        busy.current_load = 80.0;
        assert!(weights.score(&busy) < weights.score(&idle));
    }

    #[test]
    fn component_scores_follow_fee_and_depth() {
        let mut s = status();
        s.order_book_depth = 2_500.0;
        let scores = ComponentScores::for_status(&s, 0.001, 10_000.0);
        assert!((scores.cost - 0.99).abs() < 1e-12);
        assert_eq!(scores.liquidity, 0.25);
        assert_eq!(scores.reliability, 1.0);
    }
}
