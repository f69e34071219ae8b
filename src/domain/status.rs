//! Live per-venue status.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::VenueId;

/// Connection state of a venue as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Connecting,
    Error,
}

/// The live status record for one venue.
///
/// Written by the health monitor, the rebalancer and the failover controller;
/// read by everything else. Consumers always receive a copy, never a
/// reference into the shared map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueStatus {
    pub venue: VenueId,
    pub online: bool,
    pub connection: ConnectionState,
    /// Connectivity round-trip from the most recent probe.
    pub latency: Duration,
    /// Fraction of recent health checks that were healthy.
    pub availability: f64,
    /// In-flight orders currently dispatched to the venue.
    pub current_load: f64,
    pub throughput_limit: f64,
    /// Fraction of failed sub-probes over the recent window.
    pub error_rate: f64,
    pub consecutive_failures: u32,
    pub health_score: f64,
    /// Visible depth reported by the order-book probe.
    pub order_book_depth: f64,
    /// Backup currently receiving this venue's traffic, if failed away.
    pub failed_over_to: Option<VenueId>,
    pub last_ping: Option<DateTime<Utc>>,
    pub last_failover: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl VenueStatus {
    /// Initial status for a freshly registered venue: online and fully healthy
    /// until the first probe says otherwise.
    #[must_use]
    pub fn initial(venue: VenueId, throughput_limit: f64) -> Self {
        Self {
            venue,
            online: true,
            connection: ConnectionState::Connected,
            latency: Duration::ZERO,
            availability: 1.0,
            current_load: 0.0,
            throughput_limit,
            error_rate: 0.0,
            consecutive_failures: 0,
            health_score: 1.0,
            order_book_depth: 0.0,
            failed_over_to: None,
            last_ping: None,
            last_failover: None,
            last_updated: Utc::now(),
        }
    }

    /// Load as a fraction of the throughput limit.
    ///
    /// Returns `None` when no limit is configured.
    #[must_use]
    pub fn load_ratio(&self) -> Option<f64> {
        if self.throughput_limit > 0.0 {
            Some(self.current_load / self.throughput_limit)
        } else {
            None
        }
    }

    /// True if the venue may receive new orders right now.
    #[must_use]
    pub fn is_routable(&self) -> bool {
        self.online && self.connection == ConnectionState::Connected && self.failed_over_to.is_none()
    }

    #[must_use]
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_micros() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_is_routable() {
        let status = VenueStatus::initial(VenueId::new("binance"), 10_000.0);
        assert!(status.is_routable());
        assert_eq!(status.health_score, 1.0);
        assert_eq!(status.load_ratio(), Some(0.0));
    }

    #[test]
    fn failed_away_venue_is_not_routable() {
        let mut status = VenueStatus::initial(VenueId::new("binance"), 10_000.0);
        status.failed_over_to = Some(VenueId::new("okx"));
        assert!(!status.is_routable());
    }

    #[test]
    fn load_ratio_needs_a_limit() {
        let mut status = VenueStatus::initial(VenueId::new("binance"), 0.0);
        status.current_load = 5.0;
        assert_eq!(status.load_ratio(), None);
    }
}
