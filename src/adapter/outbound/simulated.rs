//! Simulated venue clients for dry runs.
//!
//! Nothing here talks to a network. Probes and executions sleep for a
//! plausible duration and report success, so the router's background work
//! and routing path can run end to end without live venues.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::domain::{ProbeReport, ProbeResult, RoutingDecision, Venue};
use crate::error::Result;
use crate::port::{ExecutionReport, FailoverExecutor, OrderExecutor, VenueProber};

/// Durations of the four simulated sub-probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimings {
    pub connectivity: Duration,
    pub api: Duration,
    pub stream: Duration,
    pub book: Duration,
}

impl Default for ProbeTimings {
    fn default() -> Self {
        Self {
            connectivity: Duration::from_millis(50),
            api: Duration::from_millis(200),
            stream: Duration::from_millis(100),
            book: Duration::from_millis(150),
        }
    }
}

/// Prober that passes every sub-test after its simulated duration.
#[derive(Debug, Clone)]
pub struct SimulatedProber {
    timings: ProbeTimings,
    book_depth: f64,
}

impl SimulatedProber {
    #[must_use]
    pub fn new(timings: ProbeTimings) -> Self {
        Self {
            timings,
            book_depth: 10_000.0,
        }
    }
}

impl Default for SimulatedProber {
    fn default() -> Self {
        Self::new(ProbeTimings::default())
    }
}

async fn timed(duration: Duration) -> ProbeResult {
    let started = Instant::now();
    tokio::time::sleep(duration).await;
    ProbeResult::passed(started.elapsed())
}

#[async_trait]
impl VenueProber for SimulatedProber {
    async fn probe(&self, venue: &Venue) -> Result<ProbeReport> {
        let (connectivity, api, stream, book) = tokio::join!(
            timed(self.timings.connectivity),
            timed(self.timings.api),
            timed(self.timings.stream),
            timed(self.timings.book),
        );
        debug!(venue = %venue.id, "Simulated probe complete");
        Ok(ProbeReport {
            connectivity,
            api,
            stream,
            book,
            book_depth: Some(self.book_depth),
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Executor that fills every order after a random delay.
#[derive(Debug, Clone)]
pub struct SimulatedExecutor {
    min_latency: Duration,
    max_latency: Duration,
    cost: Decimal,
}

impl SimulatedExecutor {
    /// Fills take between `min_latency` and `max_latency` and cost `cost`.
    #[must_use]
    pub fn new(min_latency: Duration, max_latency: Duration, cost: Decimal) -> Self {
        Self {
            min_latency,
            max_latency: max_latency.max(min_latency),
            cost,
        }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(50),
            Duration::from_millis(150),
            Decimal::new(1, 3),
        )
    }
}

#[async_trait]
impl OrderExecutor for SimulatedExecutor {
    async fn execute(&self, decision: &RoutingDecision) -> Result<ExecutionReport> {
        let latency = {
            let mut rng = rand::thread_rng();
            let min = self.min_latency.as_millis() as u64;
            let max = self.max_latency.as_millis() as u64;
            Duration::from_millis(rng.gen_range(min..=max))
        };
        tokio::time::sleep(latency).await;
        debug!(
            order = %decision.order_id,
            venue = ?decision.selected_venue.as_ref().map(|v| v.as_str()),
            latency_ms = latency.as_millis() as u64,
            "Simulated fill"
        );
        Ok(ExecutionReport::filled(latency, self.cost))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Failover executor that only logs the transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedFailover;

#[async_trait]
impl FailoverExecutor for SimulatedFailover {
    async fn transition(&self, from: &Venue, to: &Venue) -> Result<()> {
        info!(from = %from.id, to = %to.id, "Simulated traffic transition");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComponentScores, OrderId, SelectionSource, VenueId};

    #[tokio::test]
    async fn probe_reports_all_passed() {
        let prober = SimulatedProber::new(ProbeTimings {
            connectivity: Duration::from_millis(1),
            api: Duration::from_millis(2),
            stream: Duration::from_millis(1),
            book: Duration::from_millis(1),
        });
        let report = prober.probe(&Venue::new("binance")).await.unwrap();
        assert_eq!(report.failed_count(), 0);
        assert!(report.api.duration >= Duration::from_millis(2));
        assert_eq!(report.book_depth, Some(10_000.0));
    }

    #[tokio::test]
    async fn execution_latency_stays_in_range() {
        let executor = SimulatedExecutor::new(
            Duration::from_millis(1),
            Duration::from_millis(5),
            Decimal::new(1, 3),
        );
        let decision = RoutingDecision::routed(
            OrderId::new("o-1"),
            "BTCUSDT",
            "LIMIT",
            VenueId::new("binance"),
            SelectionSource::Primary,
            ComponentScores::default(),
        );
        let report = executor.execute(&decision).await.unwrap();
        assert!(report.success);
        assert!(report.actual_latency <= Duration::from_millis(5));
        assert_eq!(report.actual_cost, Decimal::new(1, 3));
    }
}
