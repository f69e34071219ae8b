//! `[[rules]]` routing rules.
//!
//! Conditions and actions use the tagged domain types directly:
//!
//! ```toml
//! [[rules]]
//! id = "primary_exchange"
//! priority = 1
//! condition = { type = "venue_health", venue = "binance", operator = "greater_than", value = 0.9 }
//! action = { type = "route_to", venue = "binance" }
//! ```

use serde::Deserialize;

use crate::domain::{ActionKind, Condition, Operator, RoutingRule, RuleAction, VenueId};

/// A configured routing rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Lower evaluates first.
    #[serde(default)]
    pub priority: i32,
    pub condition: Condition,
    pub action: RuleAction,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl RuleConfig {
    /// Venues the rule names anywhere in its condition or actions.
    #[must_use]
    pub fn referenced_venues(&self) -> Vec<&VenueId> {
        let mut venues = self.condition.referenced_venues();
        venues.extend(self.action.referenced_venues());
        venues
    }

    #[must_use]
    pub fn to_rule(&self) -> RoutingRule {
        let mut rule = RoutingRule::new(
            self.id.clone(),
            self.priority,
            self.condition.clone(),
            self.action.clone(),
        );
        if let Some(name) = &self.name {
            rule = rule.named(name.clone());
        }
        if !self.active {
            rule = rule.inactive();
        }
        rule
    }
}

/// Built-in rules: prefer binance while healthy, fail over when it degrades,
/// avoid any venue slower than 100ms.
#[must_use]
pub fn default_rules() -> Vec<RuleConfig> {
    let binance = VenueId::new("binance");
    vec![
        RuleConfig {
            id: "primary_exchange".into(),
            name: Some("Primary Exchange".into()),
            priority: 1,
            condition: Condition::VenueHealth {
                venue: Some(binance.clone()),
                operator: Operator::GreaterThan,
                value: 0.9,
            },
            action: RuleAction::new(ActionKind::RouteTo {
                venue: binance.clone(),
            }),
            active: true,
        },
        RuleConfig {
            id: "failover_rule".into(),
            name: Some("Failover Rule".into()),
            priority: 2,
            condition: Condition::VenueHealth {
                venue: Some(binance),
                operator: Operator::LessThan,
                value: 0.95,
            },
            action: RuleAction::new(ActionKind::Failover),
            active: true,
        },
        RuleConfig {
            id: "high_latency_avoidance".into(),
            name: Some("High Latency Avoidance".into()),
            priority: 3,
            condition: Condition::VenueLatency {
                venue: None,
                operator: Operator::GreaterThan,
                value_ms: 100.0,
            },
            action: RuleAction::new(ActionKind::Avoid { venue: None }),
            active: true,
        },
    ]
}
