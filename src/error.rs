use std::time::Duration;

use thiserror::Error;

use crate::domain::VenueId;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Routing, failover and lifecycle errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("no available venue for {symbol}")]
    NoAvailableVenue { symbol: String },

    #[error("venue not found: {venue}")]
    VenueNotFound { venue: VenueId },

    #[error("failover cooldown active for {venue}: {remaining:?} remaining")]
    FailoverCooldownActive { venue: VenueId, remaining: Duration },

    #[error("failover limit reached: {limit}")]
    FailoverLimitExceeded { limit: u32 },

    #[error("no healthy backup venue for {venue}")]
    NoFailoverTarget { venue: VenueId },

    #[error("failover already in progress for {venue}")]
    FailoverInProgress { venue: VenueId },

    #[error("execution failed on {venue}: {reason}")]
    ExecutionFailure { venue: VenueId, reason: String },

    #[error("router is already running")]
    AlreadyRunning,

    #[error("router is not running")]
    NotRunning,

    #[error("router is disabled")]
    Disabled,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The routing error inside, if this is one.
    #[must_use]
    pub fn as_routing(&self) -> Option<&RoutingError> {
        match self {
            Self::Routing(e) => Some(e),
            _ => None,
        }
    }
}
