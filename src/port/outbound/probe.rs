//! Venue probe port.
//!
//! A prober runs the four health sub-tests against one venue. It never
//! mutates router state; the health monitor scores and records what it
//! returns.

use async_trait::async_trait;

use crate::domain::{ProbeReport, Venue};
use crate::error::Error;

/// Client that probes venue connectivity, API, stream and order book.
#[async_trait]
pub trait VenueProber: Send + Sync {
    /// Run all four probes against `venue`.
    ///
    /// An `Err` means the probe client itself failed; the monitor counts it
    /// as four failed sub-tests.
    async fn probe(&self, venue: &Venue) -> Result<ProbeReport, Error>;

    /// Prober name for logging.
    fn name(&self) -> &'static str;
}
