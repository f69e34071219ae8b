//! Declarative routing rules.
//!
//! A rule pairs a [`Condition`] with a [`RuleAction`]. Both are closed enums so
//! evaluation is an exhaustive match over known shapes; a condition that does
//! not make sense (a numeric operator on a symbol, a venue-scoped check with no
//! venue to look at) is reported as a [`ConditionError`] rather than guessed
//! at.

use std::collections::HashMap;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{RuleId, VenueId};
use super::status::{ConnectionState, VenueStatus};

/// Comparison operator used by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
}

impl Operator {
    fn compare_number(self, actual: f64, expected: f64) -> Result<bool, ConditionError> {
        Ok(match self {
            Self::Equals => (actual - expected).abs() < f64::EPSILON,
            Self::NotEquals => (actual - expected).abs() >= f64::EPSILON,
            Self::GreaterThan => actual > expected,
            Self::LessThan => actual < expected,
            Self::GreaterOrEqual => actual >= expected,
            Self::LessOrEqual => actual <= expected,
            Self::Contains => {
                return Err(ConditionError::UnsupportedOperator {
                    operator: self,
                    kind: "numeric",
                })
            }
        })
    }

    fn compare_text(self, actual: &str, expected: &str) -> Result<bool, ConditionError> {
        Ok(match self {
            Self::Equals => actual.eq_ignore_ascii_case(expected),
            Self::NotEquals => !actual.eq_ignore_ascii_case(expected),
            Self::Contains => actual
                .to_ascii_uppercase()
                .contains(&expected.to_ascii_uppercase()),
            Self::GreaterThan | Self::LessThan | Self::GreaterOrEqual | Self::LessOrEqual => {
                return Err(ConditionError::UnsupportedOperator {
                    operator: self,
                    kind: "text",
                })
            }
        })
    }
}

/// Why a condition could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("{kind} condition has no venue and the rule has no subject venue")]
    UnresolvedVenue { kind: &'static str },

    #[error("condition references unknown venue {0}")]
    UnknownVenue(VenueId),

    #[error("operator {operator:?} does not apply to {kind} values")]
    UnsupportedOperator {
        operator: Operator,
        kind: &'static str,
    },

    #[error("hour {0} is outside 0..=23")]
    InvalidHour(u32),
}

/// What a rule checks before acting.
///
/// Venue-scoped variants take an optional venue. When it is omitted the
/// condition applies to the rule's subject venue: the target of a `route_to`
/// or `avoid`, or each candidate in turn for a targetless `avoid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Always,
    Symbol {
        operator: Operator,
        value: String,
    },
    OrderType {
        operator: Operator,
        value: String,
    },
    VenueHealth {
        #[serde(default)]
        venue: Option<VenueId>,
        operator: Operator,
        value: f64,
    },
    VenueLatency {
        #[serde(default)]
        venue: Option<VenueId>,
        operator: Operator,
        value_ms: f64,
    },
    VenueErrorRate {
        #[serde(default)]
        venue: Option<VenueId>,
        operator: Operator,
        value: f64,
    },
    /// Load as a fraction of the venue's throughput limit.
    VenueLoad {
        #[serde(default)]
        venue: Option<VenueId>,
        operator: Operator,
        value: f64,
    },
    VenueDown {
        #[serde(default)]
        venue: Option<VenueId>,
    },
    /// UTC hour window, `start_hour` inclusive and `end_hour` exclusive.
    /// Wraps past midnight when `end_hour <= start_hour`.
    TimeWindow {
        start_hour: u32,
        end_hour: u32,
    },
    All {
        conditions: Vec<Condition>,
    },
    Any {
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
}

/// Inputs a condition may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub symbol: &'a str,
    pub order_type: &'a str,
    pub statuses: &'a HashMap<VenueId, VenueStatus>,
    pub now: DateTime<Utc>,
}

impl Condition {
    /// True if any venue-scoped leaf omits its venue.
    #[must_use]
    pub fn needs_subject(&self) -> bool {
        match self {
            Self::VenueHealth { venue, .. }
            | Self::VenueLatency { venue, .. }
            | Self::VenueErrorRate { venue, .. }
            | Self::VenueLoad { venue, .. }
            | Self::VenueDown { venue } => venue.is_none(),
            Self::All { conditions } | Self::Any { conditions } => {
                conditions.iter().any(Self::needs_subject)
            }
            Self::Not { condition } => condition.needs_subject(),
            Self::Always | Self::Symbol { .. } | Self::OrderType { .. } | Self::TimeWindow { .. } => {
                false
            }
        }
    }

    /// Venues named explicitly anywhere in the condition tree.
    #[must_use]
    pub fn referenced_venues(&self) -> Vec<&VenueId> {
        let mut out = Vec::new();
        self.collect_venues(&mut out);
        out
    }

    fn collect_venues<'a>(&'a self, out: &mut Vec<&'a VenueId>) {
        match self {
            Self::VenueHealth { venue, .. }
            | Self::VenueLatency { venue, .. }
            | Self::VenueErrorRate { venue, .. }
            | Self::VenueLoad { venue, .. }
            | Self::VenueDown { venue } => out.extend(venue.as_ref()),
            Self::All { conditions } | Self::Any { conditions } => {
                for c in conditions {
                    c.collect_venues(out);
                }
            }
            Self::Not { condition } => condition.collect_venues(out),
            Self::Always | Self::Symbol { .. } | Self::OrderType { .. } | Self::TimeWindow { .. } => {}
        }
    }

    /// Evaluate against `ctx`, resolving omitted venues to `subject`.
    ///
    /// Compositions evaluate every child so a malformed branch is reported
    /// even when another branch would have decided the result.
    pub fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
        subject: Option<&VenueId>,
    ) -> Result<bool, ConditionError> {
        match self {
            Self::Always => Ok(true),
            Self::Symbol { operator, value } => operator.compare_text(ctx.symbol, value),
            Self::OrderType { operator, value } => operator.compare_text(ctx.order_type, value),
            Self::VenueHealth {
                venue,
                operator,
                value,
            } => {
                let status = resolve(ctx, venue.as_ref(), subject, "venue_health")?;
                operator.compare_number(status.health_score, *value)
            }
            Self::VenueLatency {
                venue,
                operator,
                value_ms,
            } => {
                let status = resolve(ctx, venue.as_ref(), subject, "venue_latency")?;
                operator.compare_number(status.latency_ms(), *value_ms)
            }
            Self::VenueErrorRate {
                venue,
                operator,
                value,
            } => {
                let status = resolve(ctx, venue.as_ref(), subject, "venue_error_rate")?;
                operator.compare_number(status.error_rate, *value)
            }
            Self::VenueLoad {
                venue,
                operator,
                value,
            } => {
                let status = resolve(ctx, venue.as_ref(), subject, "venue_load")?;
                operator.compare_number(status.load_ratio().unwrap_or(0.0), *value)
            }
            Self::VenueDown { venue } => {
                let status = resolve(ctx, venue.as_ref(), subject, "venue_down")?;
                Ok(!status.online || status.connection != ConnectionState::Connected)
            }
            Self::TimeWindow {
                start_hour,
                end_hour,
            } => {
                for hour in [*start_hour, *end_hour] {
                    if hour > 23 {
                        return Err(ConditionError::InvalidHour(hour));
                    }
                }
                let hour = ctx.now.hour();
                Ok(if start_hour < end_hour {
                    (*start_hour..*end_hour).contains(&hour)
                } else {
                    hour >= *start_hour || hour < *end_hour
                })
            }
            Self::All { conditions } => {
                let results = evaluate_all(conditions, ctx, subject)?;
                Ok(results.into_iter().all(|r| r))
            }
            Self::Any { conditions } => {
                let results = evaluate_all(conditions, ctx, subject)?;
                Ok(results.into_iter().any(|r| r))
            }
            Self::Not { condition } => Ok(!condition.evaluate(ctx, subject)?),
        }
    }
}

fn evaluate_all(
    conditions: &[Condition],
    ctx: &RuleContext<'_>,
    subject: Option<&VenueId>,
) -> Result<Vec<bool>, ConditionError> {
    conditions
        .iter()
        .map(|c| c.evaluate(ctx, subject))
        .collect()
}

fn resolve<'a>(
    ctx: &RuleContext<'a>,
    venue: Option<&VenueId>,
    subject: Option<&VenueId>,
    kind: &'static str,
) -> Result<&'a VenueStatus, ConditionError> {
    let id = venue
        .or(subject)
        .ok_or(ConditionError::UnresolvedVenue { kind })?;
    ctx.statuses
        .get(id)
        .ok_or_else(|| ConditionError::UnknownVenue(id.clone()))
}

/// What a matching rule does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Send the order to `venue` if it is a candidate.
    RouteTo { venue: VenueId },
    /// Drop a venue from the candidate set for this evaluation. Without a
    /// venue, drops every candidate the condition holds for.
    Avoid {
        #[serde(default)]
        venue: Option<VenueId>,
    },
    /// Hand the remaining candidates to the load balancer.
    LoadBalance,
    /// Use the failover controller's current best backup.
    Failover,
}

/// An action with an optional fallback, tried when the action cannot take
/// effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(flatten)]
    pub kind: ActionKind,
    #[serde(default)]
    pub fallback: Option<Box<RuleAction>>,
}

impl RuleAction {
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            fallback: None,
        }
    }

    #[must_use]
    pub fn or_else(mut self, fallback: RuleAction) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Venue the action is about, if it names one.
    #[must_use]
    pub fn target(&self) -> Option<&VenueId> {
        match &self.kind {
            ActionKind::RouteTo { venue } => Some(venue),
            ActionKind::Avoid { venue } => venue.as_ref(),
            ActionKind::LoadBalance | ActionKind::Failover => None,
        }
    }

    /// Venues named by this action or any fallback.
    #[must_use]
    pub fn referenced_venues(&self) -> Vec<&VenueId> {
        let mut out: Vec<&VenueId> = self.target().into_iter().collect();
        if let Some(fallback) = &self.fallback {
            out.extend(fallback.referenced_venues());
        }
        out
    }
}

/// A routing rule with its usage counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: RuleId,
    pub name: String,
    /// Lower evaluates first.
    pub priority: i32,
    pub condition: Condition,
    pub action: RuleAction,
    pub active: bool,
    pub hit_count: u64,
    pub success_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoutingRule {
    pub fn new(
        id: impl Into<RuleId>,
        priority: i32,
        condition: Condition,
        action: RuleAction,
    ) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            name: id.to_string(),
            id,
            priority,
            condition,
            action,
            active: true,
            hit_count: 0,
            success_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
