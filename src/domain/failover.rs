//! Failover triggers and events.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{FailoverId, VenueId};
use super::status::VenueStatus;

/// Degradation signal that triggered a failover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverTrigger {
    ConsecutiveFailures,
    HealthScore,
    Latency,
    ErrorRate,
    Manual,
}

/// Limits a venue status is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailoverLimits {
    pub health_threshold: f64,
    pub recovery_threshold: f64,
    pub consecutive_failures: u32,
    pub latency_threshold: Duration,
    pub error_rate: f64,
}

/// A trigger together with the value that tripped it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerSignal {
    pub trigger: FailoverTrigger,
    pub value: f64,
}

impl FailoverLimits {
    /// First degradation signal the status trips, if any.
    ///
    /// Checked in order: consecutive failures, health score, latency above
    /// twice the threshold, error rate.
    #[must_use]
    pub fn classify(&self, status: &VenueStatus) -> Option<TriggerSignal> {
        if status.consecutive_failures >= self.consecutive_failures {
            return Some(TriggerSignal {
                trigger: FailoverTrigger::ConsecutiveFailures,
                value: f64::from(status.consecutive_failures),
            });
        }
        if status.health_score < self.health_threshold {
            return Some(TriggerSignal {
                trigger: FailoverTrigger::HealthScore,
                value: status.health_score,
            });
        }
        if status.latency > self.latency_threshold * 2 {
            return Some(TriggerSignal {
                trigger: FailoverTrigger::Latency,
                value: status.latency_ms(),
            });
        }
        if status.error_rate > self.error_rate {
            return Some(TriggerSignal {
                trigger: FailoverTrigger::ErrorRate,
                value: status.error_rate,
            });
        }
        None
    }

    /// True once a failed-away venue may take traffic again.
    #[must_use]
    pub fn recovered(&self, status: &VenueStatus) -> bool {
        status.health_score >= self.recovery_threshold && status.consecutive_failures == 0
    }
}

/// Estimated cost of a failover transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FailoverImpact {
    /// In-flight orders at the source when the transition started.
    pub affected_orders: u64,
    pub interruption: Duration,
}

/// Immutable record of one failover transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverEvent {
    pub id: FailoverId,
    pub timestamp: DateTime<Utc>,
    pub from: VenueId,
    pub to: Option<VenueId>,
    pub trigger: FailoverTrigger,
    pub trigger_value: f64,
    pub reason: String,
    pub duration: Duration,
    pub success: bool,
    pub error: Option<String>,
    pub impact: FailoverImpact,
    /// Set when the source venue was later reinstated automatically.
    pub auto_recovery: bool,
    pub recovery_time: Option<DateTime<Utc>>,
}

impl FailoverEvent {
    #[must_use]
    pub fn new(from: VenueId, to: Option<VenueId>, signal: TriggerSignal) -> Self {
        Self {
            id: FailoverId::new(),
            timestamp: Utc::now(),
            reason: describe(&from, signal),
            from,
            to,
            trigger: signal.trigger,
            trigger_value: signal.value,
            duration: Duration::ZERO,
            success: false,
            error: None,
            impact: FailoverImpact::default(),
            auto_recovery: false,
            recovery_time: None,
        }
    }
}

fn describe(venue: &VenueId, signal: TriggerSignal) -> String {
    match signal.trigger {
        FailoverTrigger::ConsecutiveFailures => {
            format!("{venue}: {} consecutive health check failures", signal.value)
        }
        FailoverTrigger::HealthScore => {
            format!("{venue}: health score {:.2} below threshold", signal.value)
        }
        FailoverTrigger::Latency => format!("{venue}: latency {:.1}ms too high", signal.value),
        FailoverTrigger::ErrorRate => {
            format!("{venue}: error rate {:.1}% too high", signal.value * 100.0)
        }
        FailoverTrigger::Manual => format!("{venue}: manual failover"),
    }
}
