//! Caller-facing routing port.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{HealthCheck, OrderId, RoutingDecision, RoutingMetrics, VenueId, VenueStatus};
use crate::error::RoutingError;

/// Result of routing one order.
///
/// The decision is always present, including on failure, so callers can
/// inspect what was attempted. `error` is set when the order was not routed
/// or its execution failed.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    pub decision: RoutingDecision,
    pub error: Option<RoutingError>,
}

impl RouteOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Drop the decision on failure.
    pub fn into_result(self) -> Result<RoutingDecision, RoutingError> {
        match self.error {
            None => Ok(self.decision),
            Some(e) => Err(e),
        }
    }
}

/// Read-only snapshot of the router.
#[derive(Debug, Clone, Serialize)]
pub struct RouterStatus {
    pub running: bool,
    pub enabled: bool,
    pub smart_routing: bool,
    pub auto_failover: bool,
    pub load_balancing: bool,
    pub primary_venue: VenueId,
    pub backup_venues: Vec<VenueId>,
    pub venue_count: usize,
    pub online_venues: usize,
    pub rule_count: usize,
    pub decision_count: usize,
    pub failover_count: usize,
    pub optimization_count: usize,
    pub snapshot_count: usize,
    pub metrics: RoutingMetrics,
}

/// Operations the router exposes to callers.
#[async_trait]
pub trait OrderRouter: Send + Sync {
    /// Pick a venue for one order, execute it there and record the decision.
    async fn route_order(&self, order_id: OrderId, symbol: &str, order_type: &str) -> RouteOutcome;

    fn status(&self) -> RouterStatus;

    fn venue_status(&self, venue: &VenueId) -> Result<VenueStatus, RoutingError>;

    /// Most recent `limit` health checks, most recent last. Zero means all.
    fn health_history(&self, venue: &VenueId, limit: usize) -> Result<Vec<HealthCheck>, RoutingError>;

    fn routing_metrics(&self) -> RoutingMetrics;
}
