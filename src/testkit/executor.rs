//! Recording executors for routing and failover tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::domain::{RoutingDecision, Venue, VenueId};
use crate::error::{Error, Result};
use crate::port::{ExecutionReport, FailoverExecutor, OrderExecutor};

/// Order executor that records every decision it is handed.
///
/// Fills at a fixed latency and cost unless the decision's venue is scripted
/// to reject or to error.
pub struct RecordingExecutor {
    latency: Duration,
    cost: Decimal,
    rejecting: Mutex<HashSet<VenueId>>,
    erroring: Mutex<HashSet<VenueId>>,
    executed: Mutex<Vec<RoutingDecision>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::with_fill(Duration::from_millis(80), dec!(0.0008))
    }

    pub fn with_fill(latency: Duration, cost: Decimal) -> Self {
        Self {
            latency,
            cost,
            rejecting: Mutex::new(HashSet::new()),
            erroring: Mutex::new(HashSet::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Venue reports a rejected order.
    pub fn reject_on(&self, venue: &VenueId) {
        self.rejecting.lock().insert(venue.clone());
    }

    /// Execution client returns a transport error for the venue.
    pub fn error_on(&self, venue: &VenueId) {
        self.erroring.lock().insert(venue.clone());
    }

    pub fn executed(&self) -> Vec<RoutingDecision> {
        self.executed.lock().clone()
    }

    /// Venues in execution order.
    pub fn venues(&self) -> Vec<VenueId> {
        self.executed
            .lock()
            .iter()
            .filter_map(|d| d.selected_venue.clone())
            .collect()
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderExecutor for RecordingExecutor {
    async fn execute(&self, decision: &RoutingDecision) -> Result<ExecutionReport> {
        self.executed.lock().push(decision.clone());
        let Some(venue) = &decision.selected_venue else {
            return Ok(ExecutionReport::rejected(Duration::ZERO, "no venue selected"));
        };
        if self.erroring.lock().contains(venue) {
            return Err(Error::Io(std::io::Error::other("connection reset")));
        }
        if self.rejecting.lock().contains(venue) {
            return Ok(ExecutionReport::rejected(self.latency, "rejected by venue"));
        }
        Ok(ExecutionReport::filled(self.latency, self.cost))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Failover executor that records transitions and restores.
pub struct RecordingFailoverExecutor {
    delay: Duration,
    fail: AtomicBool,
    transitions: Mutex<Vec<(VenueId, VenueId)>>,
    restores: Mutex<Vec<VenueId>>,
}

impl RecordingFailoverExecutor {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Each transition takes `delay`, which widens race windows in
    /// concurrency tests.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            fail: AtomicBool::new(false),
            transitions: Mutex::new(Vec::new()),
            restores: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn transitions(&self) -> Vec<(VenueId, VenueId)> {
        self.transitions.lock().clone()
    }

    pub fn restores(&self) -> Vec<VenueId> {
        self.restores.lock().clone()
    }
}

impl Default for RecordingFailoverExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FailoverExecutor for RecordingFailoverExecutor {
    async fn transition(&self, from: &Venue, to: &Venue) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.transitions
            .lock()
            .push((from.id.clone(), to.id.clone()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::other("transition refused")));
        }
        Ok(())
    }

    async fn restore(&self, venue: &Venue) -> Result<()> {
        self.restores.lock().push(venue.id.clone());
        Ok(())
    }
}
