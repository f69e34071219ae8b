//! Failover controller.
//!
//! Watches published venue status for degradation and moves traffic off a
//! degraded venue onto the healthiest backup, subject to a per-venue cooldown
//! and a process-wide cap on successful failovers.
//!
//! # Reservation
//!
//! The cooldown and cap checks, the target choice and the cooldown stamp all
//! happen in one critical section on the controller mutex. Only the transition
//! itself runs outside the lock. Concurrent triggers for the same venue
//! therefore produce a single attempt: the rest see `FailoverInProgress` while
//! it runs and `FailoverCooldownActive` after.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::application::balancer::LoadBalancer;
use crate::application::registry::VenueRegistry;
use crate::domain::{
    BoundedHistory, FailoverEvent, FailoverImpact, FailoverLimits, FailoverTrigger,
    TriggerSignal, VenueId,
};
use crate::error::RoutingError;
use crate::port::FailoverExecutor;

/// Failover history capacity.
pub const HISTORY_CAPACITY: usize = 1_000;
/// Events dropped at once when the history overflows.
pub const HISTORY_TRIM: usize = 100;

/// Failover controller settings.
#[derive(Debug, Clone)]
pub struct FailoverSettings {
    pub limits: FailoverLimits,
    /// Cap on successful failovers over the process lifetime.
    pub max_failovers: u32,
    /// Minimum time between failover attempts for the same venue.
    pub cooldown: Duration,
    pub scan_interval: Duration,
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self {
            limits: FailoverLimits {
                health_threshold: 0.8,
                recovery_threshold: 0.9,
                consecutive_failures: 3,
                latency_threshold: Duration::from_millis(100),
                error_rate: 0.1,
            },
            max_failovers: 5,
            cooldown: Duration::from_secs(300),
            scan_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    last_attempt: HashMap<VenueId, Instant>,
    in_progress: HashSet<VenueId>,
    completed: u32,
    reserved: u32,
}

/// Degradation watcher and failover state machine.
pub struct FailoverController {
    registry: Arc<VenueRegistry>,
    balancer: Arc<LoadBalancer>,
    executor: Arc<dyn FailoverExecutor>,
    settings: FailoverSettings,
    primary: VenueId,
    backups: Vec<VenueId>,
    state: Mutex<ControllerState>,
    history: RwLock<BoundedHistory<FailoverEvent>>,
}

impl FailoverController {
    pub fn new(
        registry: Arc<VenueRegistry>,
        balancer: Arc<LoadBalancer>,
        executor: Arc<dyn FailoverExecutor>,
        settings: FailoverSettings,
        primary: VenueId,
        backups: Vec<VenueId>,
    ) -> Self {
        Self {
            registry,
            balancer,
            executor,
            settings,
            primary,
            backups,
            state: Mutex::new(ControllerState::default()),
            history: RwLock::new(BoundedHistory::new(HISTORY_CAPACITY, HISTORY_TRIM)),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &FailoverSettings {
        &self.settings
    }

    /// Degradation signal for `venue`, if it should fail over now.
    ///
    /// Venues already failed away or disabled never trigger.
    #[must_use]
    pub fn evaluate(&self, venue: &VenueId) -> Option<TriggerSignal> {
        if !self.registry.is_enabled(venue) {
            return None;
        }
        let status = self.registry.get(venue).ok()?;
        if status.failed_over_to.is_some() {
            return None;
        }
        self.settings.limits.classify(&status)
    }

    /// Healthiest routable backup for traffic leaving `source`.
    ///
    /// The pool is the configured backups plus the primary, minus `source`.
    /// Ties keep pool order.
    #[must_use]
    pub fn best_backup(&self, source: &VenueId) -> Option<VenueId> {
        let mut best: Option<(VenueId, f64)> = None;
        for id in std::iter::once(&self.primary).chain(&self.backups) {
            if id == source || !self.registry.is_enabled(id) {
                continue;
            }
            let Ok(status) = self.registry.get(id) else {
                continue;
            };
            if !status.is_routable() {
                continue;
            }
            if best.as_ref().map_or(true, |(_, h)| status.health_score > *h) {
                best = Some((id.clone(), status.health_score));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Attempt a failover of `source`.
    ///
    /// Suppressed attempts return an error and record nothing. An attempted
    /// transition is always recorded; `success` on the returned event tells
    /// whether it took effect.
    pub async fn trigger(
        &self,
        source: &VenueId,
        signal: TriggerSignal,
    ) -> Result<FailoverEvent, RoutingError> {
        let (reservation, target) = self.reserve(source)?;

        let from = self.registry.venue(source).cloned();
        let to = self.registry.venue(&target).cloned();
        let affected_orders = self.balancer.active_connections(source);

        let started = Instant::now();
        let outcome = match (&from, &to) {
            (Some(from), Some(to)) => self.executor.transition(from, to).await,
            _ => Err(RoutingError::VenueNotFound {
                venue: target.clone(),
            }
            .into()),
        };
        let duration = started.elapsed();
        let success = outcome.is_ok();

        reservation.commit(success);

        let now = Utc::now();
        let published = self.registry.update(source, |status| {
            status.last_failover = Some(now);
            if success {
                status.failed_over_to = Some(target.clone());
            }
        });
        if let Err(e) = published {
            warn!(error = %e, "Failover source vanished from registry");
        }

        let mut event = FailoverEvent::new(source.clone(), Some(target.clone()), signal);
        event.timestamp = now;
        event.duration = duration;
        event.success = success;
        event.impact = FailoverImpact {
            affected_orders,
            interruption: duration,
        };
        if let Err(e) = outcome {
            error!(
                from = %source,
                to = %target,
                error = %e,
                "Failover transition failed"
            );
            event.error = Some(e.to_string());
        } else {
            info!(
                from = %source,
                to = %target,
                trigger = ?signal.trigger,
                value = signal.value,
                duration_ms = duration.as_millis() as u64,
                "Failover complete"
            );
        }

        self.history.write().push(event.clone());
        Ok(event)
    }

    /// Check cooldown, cap and target, then stamp the attempt. One critical
    /// section. The returned guard releases the reservation if the attempt
    /// is dropped before it commits.
    fn reserve(&self, source: &VenueId) -> Result<(Reservation<'_>, VenueId), RoutingError> {
        let mut state = self.state.lock();

        if state.in_progress.contains(source) {
            return Err(RoutingError::FailoverInProgress {
                venue: source.clone(),
            });
        }
        if let Some(last) = state.last_attempt.get(source) {
            let elapsed = last.elapsed();
            if elapsed < self.settings.cooldown {
                return Err(RoutingError::FailoverCooldownActive {
                    venue: source.clone(),
                    remaining: self.settings.cooldown - elapsed,
                });
            }
        }
        if state.completed + state.reserved >= self.settings.max_failovers {
            return Err(RoutingError::FailoverLimitExceeded {
                limit: self.settings.max_failovers,
            });
        }
        let target = self
            .best_backup(source)
            .ok_or_else(|| RoutingError::NoFailoverTarget {
                venue: source.clone(),
            })?;

        state.in_progress.insert(source.clone());
        state.reserved += 1;
        state.last_attempt.insert(source.clone(), Instant::now());
        let reservation = Reservation {
            controller: self,
            source: source.clone(),
            settled: false,
        };
        Ok((reservation, target))
    }

    fn finish(&self, source: &VenueId, success: bool) {
        let mut state = self.state.lock();
        state.in_progress.remove(source);
        state.reserved = state.reserved.saturating_sub(1);
        if success {
            state.completed += 1;
        }
    }

    /// Reinstate `venue` if it is failed away and has recovered.
    ///
    /// Returns whether the venue was reinstated.
    pub async fn recover(&self, venue: &VenueId) -> Result<bool, RoutingError> {
        let status = self.registry.get(venue)?;
        if status.failed_over_to.is_none() || !self.settings.limits.recovered(&status) {
            return Ok(false);
        }

        if let Some(definition) = self.registry.venue(venue) {
            if let Err(e) = self.executor.restore(definition).await {
                warn!(venue = %venue, error = %e, "Venue restore failed, staying failed over");
                return Ok(false);
            }
        }

        self.registry.update(venue, |s| s.failed_over_to = None)?;

        let now = Utc::now();
        let mut history = self.history.write();
        if let Some(event) = history
            .iter_mut()
            .rev()
            .find(|e| &e.from == venue && e.success)
        {
            event.auto_recovery = true;
            event.recovery_time = Some(now);
        }
        drop(history);

        info!(venue = %venue, health = status.health_score, "Venue recovered");
        Ok(true)
    }

    /// Evaluate recovery and failover for every venue.
    ///
    /// Returns the failover events recorded by this scan.
    pub async fn scan(&self) -> Vec<FailoverEvent> {
        let mut events = Vec::new();
        for venue in self.registry.venues() {
            let id = &venue.id;
            match self.recover(id).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => warn!(venue = %id, error = %e, "Recovery check failed"),
            }

            let Some(signal) = self.evaluate(id) else {
                continue;
            };
            match self.trigger(id, signal).await {
                Ok(event) => events.push(event),
                Err(e @ RoutingError::FailoverCooldownActive { .. })
                | Err(e @ RoutingError::FailoverInProgress { .. }) => {
                    debug!(venue = %id, reason = %e, "Failover suppressed");
                }
                Err(e) => warn!(venue = %id, reason = %e, "Failover suppressed"),
            }
        }
        events
    }

    /// Manually fail `venue` over, still subject to cooldown and cap.
    pub async fn force(&self, venue: &VenueId) -> Result<FailoverEvent, RoutingError> {
        if !self.registry.contains(venue) {
            return Err(RoutingError::VenueNotFound {
                venue: venue.clone(),
            });
        }
        self.trigger(
            venue,
            TriggerSignal {
                trigger: FailoverTrigger::Manual,
                value: 0.0,
            },
        )
        .await
    }

    #[must_use]
    pub fn history(&self) -> Vec<FailoverEvent> {
        self.history.read().to_vec()
    }

    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.read().len()
    }

    #[must_use]
    pub fn events_since(&self, since: DateTime<Utc>) -> u64 {
        self.history
            .read()
            .iter()
            .filter(|e| e.timestamp >= since)
            .count() as u64
    }

    /// Successful failovers counted against the cap.
    #[must_use]
    pub fn completed(&self) -> u32 {
        self.state.lock().completed
    }
}

/// In-flight failover slot for one source venue.
///
/// Dropping it unsettled counts the attempt as failed.
struct Reservation<'a> {
    controller: &'a FailoverController,
    source: VenueId,
    settled: bool,
}

impl Reservation<'_> {
    fn commit(mut self, success: bool) {
        self.settled = true;
        self.controller.finish(&self.source, success);
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!(venue = %self.source, "Failover attempt abandoned mid-transition");
            self.controller.finish(&self.source, false);
        }
    }
}
