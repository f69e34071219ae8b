//! Scripted [`VenueProber`] for health and failover tests.
//!
//! Every venue returns a healthy report unless a test scripts something else
//! for it. Reports, errors and delays can be changed between cycles.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{ProbeReport, ProbeResult, Venue, VenueId};
use crate::error::{Error, Result};
use crate::port::VenueProber;

/// All four probes pass at 50ms with 5,000 units of depth.
pub fn healthy_report() -> ProbeReport {
    let ok = ProbeResult::passed(Duration::from_millis(50));
    ProbeReport {
        connectivity: ok.clone(),
        api: ok.clone(),
        stream: ok.clone(),
        book: ok,
        book_depth: Some(5_000.0),
    }
}

/// Connected but slow: every probe passes at 600ms, scoring 0.45.
pub fn degraded_report() -> ProbeReport {
    let slow = ProbeResult::passed(Duration::from_millis(600));
    ProbeReport {
        connectivity: slow.clone(),
        api: slow.clone(),
        stream: slow.clone(),
        book: slow,
        book_depth: Some(1_000.0),
    }
}

/// Every probe fails.
pub fn failing_report() -> ProbeReport {
    ProbeReport::all_failed(Duration::from_millis(10), "connection refused")
}

enum Script {
    Report(ProbeReport),
    Error(String),
}

/// Prober with per-venue scripted outcomes.
pub struct ScriptedProber {
    scripts: Mutex<HashMap<VenueId, Script>>,
    delays: Mutex<HashMap<VenueId, Duration>>,
    counts: Mutex<HashMap<VenueId, u32>>,
}

impl ScriptedProber {
    /// Every venue healthy until scripted otherwise.
    pub fn healthy() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn set(&self, venue: &VenueId, report: ProbeReport) {
        self.scripts
            .lock()
            .insert(venue.clone(), Script::Report(report));
    }

    /// Make the probe client itself fail for `venue`.
    pub fn set_error(&self, venue: &VenueId, message: &str) {
        self.scripts
            .lock()
            .insert(venue.clone(), Script::Error(message.to_string()));
    }

    pub fn set_delay(&self, venue: &VenueId, delay: Duration) {
        self.delays.lock().insert(venue.clone(), delay);
    }

    /// Number of probes run against `venue`.
    pub fn probe_count(&self, venue: &VenueId) -> u32 {
        self.counts.lock().get(venue).copied().unwrap_or(0)
    }
}

#[async_trait]
impl VenueProber for ScriptedProber {
    async fn probe(&self, venue: &Venue) -> Result<ProbeReport> {
        *self.counts.lock().entry(venue.id.clone()).or_insert(0) += 1;

        let delay = self.delays.lock().get(&venue.id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripts = self.scripts.lock();
        match scripts.get(&venue.id) {
            None => Ok(healthy_report()),
            Some(Script::Report(r)) => Ok(r.clone()),
            Some(Script::Error(m)) => Err(Error::Io(std::io::Error::other(m.clone()))),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
