//! Venue catalog entries.
//!
//! A [`Venue`] describes an execution destination: where it lives, what it
//! can trade and what it charges. Definitions are built once from
//! configuration and never change afterwards; the mutable side of a venue
//! lives in [`VenueStatus`](super::status::VenueStatus).

use std::time::Duration;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::VenueId;

/// Market type served by a venue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    #[default]
    Spot,
    Futures,
    Options,
}

/// Connection descriptor for one API surface of a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub base_url: String,
    pub version: String,
    pub timeout: Duration,
    pub retry_attempts: u32,
}

/// Trading fee schedule, expressed as rates of notional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub maker: Decimal,
    pub taker: Decimal,
    /// Rate used when scoring routing cost.
    ///
    /// Falls back to the taker rate when unset; which side actually applies
    /// to a fill is decided by the execution client.
    pub scoring: Option<Decimal>,
}

impl FeeSchedule {
    /// The single per-venue rate used for cost scoring.
    #[must_use]
    pub fn scoring_rate(&self) -> Decimal {
        self.scoring.unwrap_or(self.taker)
    }

    /// Scoring rate as a float, for score arithmetic.
    #[must_use]
    pub fn scoring_rate_f64(&self) -> f64 {
        self.scoring_rate().to_f64().unwrap_or(0.0)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            maker: Decimal::new(1, 3),
            taker: Decimal::new(1, 3),
            scoring: None,
        }
    }
}

/// A venue definition from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: VenueId,
    pub display_name: String,
    pub region: String,
    pub kind: VenueKind,
    /// Lower is preferred; seeds the initial balancer weight as `1 / priority`.
    pub priority: u32,
    /// Maximum sustainable load, used as the status throughput limit.
    pub capacity: f64,
    pub rest_api: ApiEndpoint,
    pub websocket_api: Option<ApiEndpoint>,
    pub fees: FeeSchedule,
    pub symbols: Vec<String>,
    /// Supported order types. Empty means every order type is accepted.
    pub order_types: Vec<String>,
}

impl Venue {
    /// Create a venue with neutral defaults; mostly useful for tests and
    /// programmatic catalogs.
    pub fn new(id: impl Into<VenueId>) -> Self {
        let id = id.into();
        Self {
            display_name: id.to_string(),
            id,
            region: "global".to_string(),
            kind: VenueKind::Spot,
            priority: 1,
            capacity: 1000.0,
            rest_api: ApiEndpoint {
                base_url: "https://localhost".to_string(),
                version: "v1".to_string(),
                timeout: Duration::from_secs(5),
                retry_attempts: 3,
            },
            websocket_api: None,
            fees: FeeSchedule::default(),
            symbols: Vec::new(),
            order_types: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict accepted order types. Empty accepts every type.
    #[must_use]
    pub fn with_order_types<I, S>(mut self, order_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_types = order_types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    /// True if the venue lists `symbol` among its instruments.
    #[must_use]
    pub fn supports_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// True if the venue accepts `order_type`.
    #[must_use]
    pub fn supports_order_type(&self, order_type: &str) -> bool {
        self.order_types.is_empty()
            || self
                .order_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(order_type))
    }
}
