//! Failover transition port.

use async_trait::async_trait;

use crate::domain::Venue;
use crate::error::Error;

/// Performs the venue-side work of moving traffic between venues.
#[async_trait]
pub trait FailoverExecutor: Send + Sync {
    /// Move traffic from `from` to `to`.
    async fn transition(&self, from: &Venue, to: &Venue) -> Result<(), Error>;

    /// Bring a recovered venue back into service.
    async fn restore(&self, venue: &Venue) -> Result<(), Error> {
        let _ = venue;
        Ok(())
    }
}
