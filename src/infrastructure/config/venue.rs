//! `[[venues]]` catalog entries.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::domain::{ApiEndpoint, FeeSchedule, Venue, VenueId, VenueKind};
use crate::error::{ConfigError, Result};

/// One API surface of a venue.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub version: String,
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

fn default_api_version() -> String {
    "v1".into()
}

const fn default_api_timeout_ms() -> u64 {
    5_000
}

const fn default_retry_attempts() -> u32 {
    3
}

impl ApiConfig {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.into(),
            version: default_api_version(),
            timeout_ms: default_api_timeout_ms(),
            retry_attempts: default_retry_attempts(),
        }
    }

    fn validate(&self, field: &'static str) -> Result<()> {
        Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            field,
            reason: format!("{}: {e}", self.base_url),
        })?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field,
                reason: "timeout_ms must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn to_endpoint(&self) -> ApiEndpoint {
        ApiEndpoint {
            base_url: self.base_url.clone(),
            version: self.version.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            retry_attempts: self.retry_attempts,
        }
    }
}

/// Fee schedule as configured, in rates of notional.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_fee")]
    pub maker: Decimal,
    #[serde(default = "default_fee")]
    pub taker: Decimal,
    /// Rate used for cost scoring; defaults to `taker`.
    #[serde(default)]
    pub scoring: Option<Decimal>,
}

fn default_fee() -> Decimal {
    Decimal::new(1, 3) // 0.1%
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            maker: default_fee(),
            taker: default_fee(),
            scoring: None,
        }
    }
}

/// A venue catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub kind: VenueKind,
    /// Lower is preferred.
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_capacity")]
    pub capacity: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub rest_api: ApiConfig,
    #[serde(default)]
    pub websocket_api: Option<ApiConfig>,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Empty accepts every order type.
    #[serde(default)]
    pub order_types: Vec<String>,
}

fn default_region() -> String {
    "global".into()
}

const fn default_priority() -> u32 {
    1
}

const fn default_capacity() -> f64 {
    1000.0
}

const fn default_enabled() -> bool {
    true
}

impl VenueConfig {
    /// Validate one entry.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "venues.id" }.into());
        }
        if self.capacity.is_nan() || self.capacity <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "venues.capacity",
                reason: format!("{}: must be greater than 0", self.id),
            }
            .into());
        }
        if self.priority == 0 {
            return Err(ConfigError::InvalidValue {
                field: "venues.priority",
                reason: format!("{}: must be at least 1", self.id),
            }
            .into());
        }
        let fees = [Some(self.fees.maker), Some(self.fees.taker), self.fees.scoring];
        if fees.iter().flatten().any(|f| *f < Decimal::ZERO) {
            return Err(ConfigError::InvalidValue {
                field: "venues.fees",
                reason: format!("{}: fees must be 0 or greater", self.id),
            }
            .into());
        }
        self.rest_api.validate("venues.rest_api")?;
        if let Some(ws) = &self.websocket_api {
            ws.validate("venues.websocket_api")?;
        }
        Ok(())
    }

    #[must_use]
    pub fn venue_id(&self) -> VenueId {
        VenueId::new(self.id.clone())
    }

    /// Domain definition of this venue.
    #[must_use]
    pub fn to_venue(&self) -> Venue {
        Venue {
            id: self.venue_id(),
            display_name: self.display_name.clone().unwrap_or_else(|| self.id.clone()),
            region: self.region.clone(),
            kind: self.kind,
            priority: self.priority,
            capacity: self.capacity,
            rest_api: self.rest_api.to_endpoint(),
            websocket_api: self.websocket_api.as_ref().map(ApiConfig::to_endpoint),
            fees: FeeSchedule {
                maker: self.fees.maker,
                taker: self.fees.taker,
                scoring: self.fees.scoring,
            },
            symbols: self.symbols.clone(),
            order_types: self.order_types.clone(),
        }
    }
}

fn catalog_entry(
    id: &str,
    name: &str,
    priority: u32,
    rest: &str,
    ws: &str,
    maker: Decimal,
    taker: Decimal,
) -> VenueConfig {
    VenueConfig {
        id: id.into(),
        display_name: Some(name.into()),
        region: default_region(),
        kind: VenueKind::Spot,
        priority,
        capacity: default_capacity(),
        enabled: true,
        rest_api: ApiConfig::new(rest),
        websocket_api: Some(ApiConfig::new(ws)),
        fees: FeeConfig {
            maker,
            taker,
            scoring: None,
        },
        symbols: ["BTCUSDT", "ETHUSDT", "BNBUSDT"]
            .into_iter()
            .map(String::from)
            .collect(),
        order_types: ["LIMIT", "MARKET"].into_iter().map(String::from).collect(),
    }
}

/// Built-in catalog: binance, okx, bybit.
#[must_use]
pub fn default_venues() -> Vec<VenueConfig> {
    vec![
        catalog_entry(
            "binance",
            "Binance",
            1,
            "https://api.binance.com",
            "wss://stream.binance.com:9443",
            Decimal::new(1, 3),
            Decimal::new(1, 3),
        ),
        catalog_entry(
            "okx",
            "OKX",
            2,
            "https://www.okx.com",
            "wss://ws.okx.com:8443",
            Decimal::new(8, 4),
            Decimal::new(1, 3),
        ),
        catalog_entry(
            "bybit",
            "Bybit",
            3,
            "https://api.bybit.com",
            "wss://stream.bybit.com",
            Decimal::new(1, 3),
            Decimal::new(1, 3),
        ),
    ]
}
