//! Venue-agnostic routing domain: plain data and pure functions.

mod decision;
mod failover;
mod health;
mod history;
mod id;
mod metrics;
mod optimization;
mod rule;
mod score;
mod status;
mod venue;

// Identifiers
pub use id::{DecisionId, FailoverId, OrderId, RuleId, VenueId};

// Venue catalog and live status
pub use status::{ConnectionState, VenueStatus};
pub use venue::{ApiEndpoint, FeeSchedule, Venue, VenueKind};

// Health
pub use health::{latency_score, HealthCheck, ProbeReport, ProbeResult};

// Rules
pub use rule::{
    ActionKind, Condition, ConditionError, Operator, RoutingRule, RuleAction, RuleContext,
};

// Scoring and decisions
pub use decision::{RoutingDecision, SelectionSource};
pub use score::{latency_component, load_component, ComponentScores, ScoreWeights};

// Failover
pub use failover::{FailoverEvent, FailoverImpact, FailoverLimits, FailoverTrigger, TriggerSignal};

// Optimisation and metrics
pub use metrics::{percentile, PerformanceSnapshot, RoutingMetrics, VenuePerformance, VenueRoutingStats};
pub use optimization::{target_shares, OptimizationResult, VenueShare, VenueSignals};

pub use history::BoundedHistory;
