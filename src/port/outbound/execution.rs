//! Order execution port.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::RoutingDecision;
use crate::error::Error;

/// What the execution client reports back for one routed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub actual_latency: Duration,
    pub actual_cost: Decimal,
    pub error: Option<String>,
}

impl ExecutionReport {
    #[must_use]
    pub fn filled(actual_latency: Duration, actual_cost: Decimal) -> Self {
        Self {
            success: true,
            actual_latency,
            actual_cost,
            error: None,
        }
    }

    pub fn rejected(actual_latency: Duration, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            actual_latency,
            actual_cost: Decimal::ZERO,
            error: Some(reason.into()),
        }
    }
}

/// Executor for sending a routed order to its selected venue.
///
/// Retry policy belongs to the caller of the router, not to implementations.
#[async_trait]
pub trait OrderExecutor: Send + Sync {
    /// Execute the order described by `decision` at its selected venue.
    async fn execute(&self, decision: &RoutingDecision) -> Result<ExecutionReport, Error>;

    /// Executor name for logging.
    fn name(&self) -> &'static str;
}
