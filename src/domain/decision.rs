//! Routing decisions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{DecisionId, OrderId, RuleId, VenueId};
use super::score::ComponentScores;

/// How the venue for a decision was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    Rule,
    Scoring,
    LoadBalancer,
    Primary,
    /// No venue could be chosen.
    None,
}

/// Immutable record of one order's routing outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub id: DecisionId,
    pub order_id: OrderId,
    pub symbol: String,
    pub order_type: String,
    pub timestamp: DateTime<Utc>,
    pub selected_venue: Option<VenueId>,
    pub source: SelectionSource,
    /// Other eligible venues in candidate order, for caller-side retries.
    pub alternatives: Vec<VenueId>,
    /// Rules whose conditions held, in evaluation order.
    pub matched_rules: Vec<RuleId>,
    pub scores: ComponentScores,
    pub overall_score: f64,
    pub expected_latency: Duration,
    pub expected_cost: Decimal,
    pub actual_latency: Option<Duration>,
    pub actual_cost: Option<Decimal>,
    /// Wall time from receiving the order to recording the decision.
    pub execution_time: Duration,
    pub success: bool,
    pub error: Option<String>,
}

impl RoutingDecision {
    /// A decision that never reached a venue.
    pub fn unrouted(
        order_id: OrderId,
        symbol: impl Into<String>,
        order_type: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: DecisionId::new(),
            order_id,
            symbol: symbol.into(),
            order_type: order_type.into(),
            timestamp: Utc::now(),
            selected_venue: None,
            source: SelectionSource::None,
            alternatives: Vec::new(),
            matched_rules: Vec::new(),
            scores: ComponentScores::default(),
            overall_score: 0.0,
            expected_latency: Duration::ZERO,
            expected_cost: Decimal::ZERO,
            actual_latency: None,
            actual_cost: None,
            execution_time: Duration::ZERO,
            success: false,
            error: Some(error.into()),
        }
    }

    /// A decision routed to `venue`, pending execution.
    pub fn routed(
        order_id: OrderId,
        symbol: impl Into<String>,
        order_type: impl Into<String>,
        venue: VenueId,
        source: SelectionSource,
        scores: ComponentScores,
    ) -> Self {
        Self {
            id: DecisionId::new(),
            order_id,
            symbol: symbol.into(),
            order_type: order_type.into(),
            timestamp: Utc::now(),
            selected_venue: Some(venue),
            source,
            alternatives: Vec::new(),
            matched_rules: Vec::new(),
            overall_score: scores.overall(),
            scores,
            expected_latency: Duration::ZERO,
            expected_cost: Decimal::ZERO,
            actual_latency: None,
            actual_cost: None,
            execution_time: Duration::ZERO,
            success: false,
            error: None,
        }
    }

    #[must_use]
    pub fn actual_latency_ms(&self) -> Option<f64> {
        self.actual_latency
            .map(|d| d.as_micros() as f64 / 1000.0)
    }
}
