//! Probe results and health checks.
//!
//! A health check turns four probe results into a single score in `[0, 1]`.
//! Each passed probe scores by its duration (see [`latency_score`]); a failed
//! probe scores zero. The overall score is the plain mean of the four.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::VenueId;

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub passed: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

impl ProbeResult {
    #[must_use]
    pub fn passed(duration: Duration) -> Self {
        Self {
            passed: true,
            duration,
            error: None,
        }
    }

    pub fn failed(duration: Duration, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            duration,
            error: Some(error.into()),
        }
    }

    /// Sub-score for this probe.
    #[must_use]
    pub fn score(&self) -> f64 {
        if self.passed {
            latency_score(self.duration)
        } else {
            0.0
        }
    }
}

/// The four probe results for one venue in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub connectivity: ProbeResult,
    pub api: ProbeResult,
    pub stream: ProbeResult,
    pub book: ProbeResult,
    /// Visible order-book depth observed by the book probe, if any.
    pub book_depth: Option<f64>,
}

impl ProbeReport {
    /// A report in which every probe failed with the same reason, used when
    /// the probe client errors or times out as a whole.
    pub fn all_failed(duration: Duration, error: impl Into<String>) -> Self {
        let error = error.into();
        let failed = ProbeResult::failed(duration, error);
        Self {
            connectivity: failed.clone(),
            api: failed.clone(),
            stream: failed.clone(),
            book: failed,
            book_depth: None,
        }
    }

    fn results(&self) -> [&ProbeResult; 4] {
        [&self.connectivity, &self.api, &self.stream, &self.book]
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results().iter().filter(|r| !r.passed).count()
    }
}

/// Map a probe duration to a score.
///
/// Up to 100ms scores 1.0; from 100ms to 500ms the score falls linearly to
/// 0.5; past 500ms it keeps falling at half that slope and bottoms out at 0.0.
#[must_use]
pub fn latency_score(duration: Duration) -> f64 {
    let ms = duration.as_micros() as f64 / 1000.0;
    if ms <= 100.0 {
        1.0
    } else if ms <= 500.0 {
        1.0 - (ms - 100.0) / 400.0 * 0.5
    } else {
        0.5 - ((ms - 500.0) / 1000.0 * 0.5).min(0.5)
    }
}

/// Immutable snapshot of one probe cycle for one venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub venue: VenueId,
    pub timestamp: DateTime<Utc>,
    pub report: ProbeReport,
    pub connectivity_score: f64,
    pub api_score: f64,
    pub stream_score: f64,
    pub book_score: f64,
    pub health_score: f64,
    pub healthy: bool,
}

impl HealthCheck {
    /// Score a probe report against the health threshold.
    #[must_use]
    pub fn evaluate(
        venue: VenueId,
        timestamp: DateTime<Utc>,
        report: ProbeReport,
        threshold: f64,
    ) -> Self {
        let connectivity_score = report.connectivity.score();
        let api_score = report.api.score();
        let stream_score = report.stream.score();
        let book_score = report.book.score();
        let health_score = (connectivity_score + api_score + stream_score + book_score) / 4.0;

        Self {
            venue,
            timestamp,
            report,
            connectivity_score,
            api_score,
            stream_score,
            book_score,
            health_score,
            healthy: health_score >= threshold,
        }
    }

    /// Human-readable reason when the check is unhealthy.
    #[must_use]
    pub fn failure_reason(&self, threshold: f64) -> Option<String> {
        (!self.healthy).then(|| {
            format!(
                "health score {:.2} below threshold {:.2}",
                self.health_score, threshold
            )
        })
    }
}
