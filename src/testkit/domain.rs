//! Builders for domain primitives used across tests.
//!
//! Provides concise factory functions for venues, registries and rules so
//! tests focus on assertions rather than construction boilerplate.

use std::sync::Arc;

use rust_decimal_macros::dec;

use crate::application::registry::VenueRegistry;
use crate::domain::{
    ActionKind, Condition, FeeSchedule, Operator, RoutingRule, RuleAction, Venue, VenueId,
};

/// Symbols every catalog venue lists.
pub const SYMBOLS: [&str; 3] = ["BTCUSDT", "ETHUSDT", "BNBUSDT"];

/// Order types every catalog venue accepts.
pub const ORDER_TYPES: [&str; 2] = ["LIMIT", "MARKET"];

/// Create a [`VenueId`] from a string.
pub fn venue_id(id: &str) -> VenueId {
    VenueId::new(id)
}

/// A spot venue listing [`SYMBOLS`] and [`ORDER_TYPES`] with the given
/// priority and taker fee.
pub fn venue(id: &str, priority: u32, taker: rust_decimal::Decimal) -> Venue {
    Venue::new(id)
        .with_symbols(SYMBOLS)
        .with_order_types(ORDER_TYPES)
        .with_priority(priority)
        .with_capacity(1_000.0)
        .with_fees(FeeSchedule {
            maker: taker / dec!(2),
            taker,
            scoring: None,
        })
}

/// The three-venue catalog: binance (primary), okx, bybit.
pub fn catalog() -> Vec<Venue> {
    vec![
        venue("binance", 1, dec!(0.001)),
        venue("okx", 2, dec!(0.0008)),
        venue("bybit", 3, dec!(0.001)),
    ]
}

/// Wrap a catalog in a shared registry.
pub fn registry(venues: Vec<Venue>) -> Arc<VenueRegistry> {
    Arc::new(VenueRegistry::new(venues))
}

/// Rule with an `always` condition.
pub fn always(id: &str, priority: i32, action: ActionKind) -> RoutingRule {
    RoutingRule::new(id, priority, Condition::Always, RuleAction::new(action))
}

/// `route_to` rule guarded by the target's health.
pub fn route_when_healthy(id: &str, priority: i32, target: &str, min_health: f64) -> RoutingRule {
    RoutingRule::new(
        id,
        priority,
        Condition::VenueHealth {
            venue: None,
            operator: Operator::GreaterThan,
            value: min_health,
        },
        RuleAction::new(ActionKind::RouteTo {
            venue: venue_id(target),
        }),
    )
}

/// Unconditional `avoid` of one venue.
pub fn avoid(id: &str, priority: i32, target: &str) -> RoutingRule {
    always(
        id,
        priority,
        ActionKind::Avoid {
            venue: Some(venue_id(target)),
        },
    )
}
