//! Router orchestrator.
//!
//! Owns every stateful component and wires them into the per-order path:
//! candidates, rules, scoring, balancing, primary fallback, execution. The
//! periodic work (health, rebalance, failover, optimizer, snapshots, metrics)
//! runs in a [`TaskGroup`] between [`Router::start`] and [`Router::stop`];
//! each piece can also be invoked directly.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::application::balancer::{
    BalancingAlgorithm, LoadBalancer, RebalanceSettings, WeightAdjustment,
};
use crate::application::failover::{FailoverController, FailoverSettings};
use crate::application::health::{HealthMonitor, HealthSettings};
use crate::application::metrics::MetricsCollector;
use crate::application::optimizer::{OptimizerSettings, RoutingOptimizer};
use crate::application::registry::VenueRegistry;
use crate::application::rules::{RuleDelegate, RuleEngine};
use crate::application::supervisor::TaskGroup;
use crate::domain::{
    ComponentScores, FailoverEvent, HealthCheck, OptimizationResult, OrderId,
    PerformanceSnapshot, RoutingDecision, RoutingMetrics, RoutingRule, RuleContext, RuleId,
    SelectionSource, Venue, VenueId, VenueStatus,
};
use crate::error::{ConfigError, Result, RoutingError};
use crate::port::{
    FailoverExecutor, OrderExecutor, OrderRouter, RouteOutcome, RouterStatus, VenueProber,
};

/// Load balancer settings.
#[derive(Debug, Clone)]
pub struct BalancerSettings {
    pub algorithm: BalancingAlgorithm,
    pub rebalance_interval: Duration,
    pub rebalance: RebalanceSettings,
}

impl Default for BalancerSettings {
    fn default() -> Self {
        Self {
            algorithm: BalancingAlgorithm::Weighted,
            rebalance_interval: Duration::from_secs(60),
            rebalance: RebalanceSettings::default(),
        }
    }
}

/// Metrics cadence.
#[derive(Debug, Clone)]
pub struct MetricsSettings {
    pub interval: Duration,
    pub snapshot_interval: Duration,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            snapshot_interval: Duration::from_secs(300),
        }
    }
}

/// Everything the router needs besides the catalog, rules and collaborators.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub enabled: bool,
    pub primary: VenueId,
    pub backups: Vec<VenueId>,
    pub smart_routing: bool,
    pub auto_failover: bool,
    pub load_balancing: bool,
    pub health: HealthSettings,
    pub failover: FailoverSettings,
    pub balancer: BalancerSettings,
    pub optimizer: OptimizerSettings,
    pub metrics: MetricsSettings,
}

impl RouterSettings {
    /// Default settings around the given primary and backups.
    pub fn new(primary: impl Into<VenueId>, backups: Vec<VenueId>) -> Self {
        Self {
            enabled: true,
            primary: primary.into(),
            backups,
            smart_routing: true,
            auto_failover: true,
            load_balancing: true,
            health: HealthSettings::default(),
            failover: FailoverSettings::default(),
            balancer: BalancerSettings::default(),
            optimizer: OptimizerSettings::default(),
            metrics: MetricsSettings::default(),
        }
    }
}

/// External clients the router drives.
#[derive(Clone)]
pub struct Collaborators {
    pub prober: Arc<dyn VenueProber>,
    pub executor: Arc<dyn OrderExecutor>,
    pub failover: Arc<dyn FailoverExecutor>,
}

/// The smart order router.
pub struct Router {
    settings: RouterSettings,
    registry: Arc<VenueRegistry>,
    balancer: Arc<LoadBalancer>,
    health: HealthMonitor,
    failover: FailoverController,
    rules: RuleEngine,
    optimizer: RoutingOptimizer,
    metrics: MetricsCollector,
    executor: Arc<dyn OrderExecutor>,
    tasks: tokio::sync::Mutex<Option<TaskGroup>>,
    running: AtomicBool,
}

/// Lets rule actions reach the balancer and failover controller.
struct RouterDelegate<'a> {
    router: &'a Router,
}

impl RuleDelegate for RouterDelegate<'_> {
    fn balance(&self, candidates: &[VenueId]) -> Option<VenueId> {
        self.router.balancer.select(candidates)
    }

    fn failover_target(&self) -> Option<VenueId> {
        self.router.failover.best_backup(&self.router.settings.primary)
    }
}

impl Router {
    /// Build a router over `venues` and `rules`.
    ///
    /// Fails when the catalog is empty or the primary or a backup is not in
    /// it. Balancer weights start at `1 / priority`.
    pub fn new(
        settings: RouterSettings,
        venues: Vec<Venue>,
        rules: Vec<RoutingRule>,
        collaborators: Collaborators,
    ) -> Result<Self> {
        if venues.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "venues",
                reason: "at least one venue is required".to_string(),
            }
            .into());
        }
        let registry = Arc::new(VenueRegistry::new(venues));
        for id in std::iter::once(&settings.primary).chain(&settings.backups) {
            if !registry.contains(id) {
                return Err(RoutingError::VenueNotFound { venue: id.clone() }.into());
            }
        }

        let balancer = Arc::new(
            LoadBalancer::new(settings.balancer.algorithm).with_weights(
                registry
                    .venues()
                    .iter()
                    .map(|v| (v.id.clone(), 1.0 / f64::from(v.priority.max(1)))),
            ),
        );
        let health = HealthMonitor::new(
            registry.clone(),
            collaborators.prober,
            settings.health.clone(),
        );
        let failover = FailoverController::new(
            registry.clone(),
            balancer.clone(),
            collaborators.failover,
            settings.failover.clone(),
            settings.primary.clone(),
            settings.backups.clone(),
        );
        let optimizer = RoutingOptimizer::new(
            registry.clone(),
            balancer.clone(),
            settings.optimizer.clone(),
        );
        let primary_fee = registry
            .venue(&settings.primary)
            .map(|v| v.fees.scoring_rate())
            .unwrap_or_default();

        info!(
            venues = registry.len(),
            rules = rules.len(),
            primary = %settings.primary,
            algorithm = ?settings.balancer.algorithm,
            "Router initialised"
        );

        Ok(Self {
            registry,
            balancer,
            health,
            failover,
            rules: RuleEngine::new(rules),
            optimizer,
            metrics: MetricsCollector::new(primary_fee),
            executor: collaborators.executor,
            tasks: tokio::sync::Mutex::new(None),
            running: AtomicBool::new(false),
            settings,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    /// Route one order: choose a venue, execute there, record the decision.
    ///
    /// Never panics past the caller; failures come back as the outcome's
    /// error with the decision still attached.
    pub async fn route_order(
        &self,
        order_id: OrderId,
        symbol: &str,
        order_type: &str,
    ) -> RouteOutcome {
        let started = Instant::now();
        if !self.settings.enabled {
            let error = RoutingError::Disabled;
            return RouteOutcome {
                decision: RoutingDecision::unrouted(order_id, symbol, order_type, error.to_string()),
                error: Some(error),
            };
        }

        let candidates = self.candidates(symbol, order_type);
        if candidates.is_empty() {
            let error = RoutingError::NoAvailableVenue {
                symbol: symbol.to_string(),
            };
            warn!(order = %order_id, symbol, order_type, "No available venue");
            let mut decision =
                RoutingDecision::unrouted(order_id, symbol, order_type, error.to_string());
            decision.execution_time = started.elapsed();
            self.metrics.record_decision(decision.clone());
            return RouteOutcome {
                decision,
                error: Some(error),
            };
        }

        let statuses = self.registry.statuses();
        let ctx = RuleContext {
            symbol,
            order_type,
            statuses: &statuses,
            now: Utc::now(),
        };
        let evaluation = self
            .rules
            .evaluate(&ctx, candidates, &RouterDelegate { router: self });

        let (venue, source) = match evaluation.venue.clone() {
            Some(venue) => (venue, SelectionSource::Rule),
            None => self.select(&evaluation.candidates, &statuses),
        };

        let definition = self.registry.venue(&venue);
        let fee = definition.map(|v| v.fees.scoring_rate()).unwrap_or_default();
        let status = statuses.get(&venue);
        let scores = status
            .map(|s| {
                ComponentScores::for_status(
                    s,
                    definition.map_or(0.0, |v| v.fees.scoring_rate_f64()),
                    self.settings.optimizer.liquidity_reference_depth,
                )
            })
            .unwrap_or_default();

        let mut decision = RoutingDecision::routed(
            order_id,
            symbol,
            order_type,
            venue.clone(),
            source,
            scores,
        );
        decision.matched_rules = evaluation.matched.clone();
        decision.alternatives = evaluation
            .candidates
            .iter()
            .filter(|id| **id != venue)
            .cloned()
            .collect();
        decision.expected_latency = status.map(|s| s.latency).unwrap_or_default();
        decision.expected_cost = fee;

        let result = {
            let _in_flight = self.balancer.acquire(&venue);
            self.executor.execute(&decision).await
        };

        let error = match result {
            Ok(report) => {
                decision.actual_latency = Some(report.actual_latency);
                decision.actual_cost = Some(report.actual_cost);
                decision.success = report.success;
                if report.success {
                    None
                } else {
                    let reason = report
                        .error
                        .unwrap_or_else(|| "rejected by venue".to_string());
                    decision.error = Some(reason.clone());
                    Some(RoutingError::ExecutionFailure {
                        venue: venue.clone(),
                        reason,
                    })
                }
            }
            Err(e) => {
                decision.error = Some(e.to_string());
                Some(RoutingError::ExecutionFailure {
                    venue: venue.clone(),
                    reason: e.to_string(),
                })
            }
        };

        match &error {
            None => debug!(
                order = %decision.order_id,
                venue = %venue,
                source = ?source,
                score = decision.overall_score,
                "Order routed"
            ),
            Some(e) => warn!(
                order = %decision.order_id,
                venue = %venue,
                error = %e,
                "Order execution failed"
            ),
        }

        decision.execution_time = started.elapsed();
        self.rules.record_outcome(&evaluation.matched, decision.success);
        self.metrics.record_decision(decision.clone());
        RouteOutcome { decision, error }
    }

    /// Candidates for the symbol that also accept the order type.
    fn candidates(&self, symbol: &str, order_type: &str) -> Vec<VenueId> {
        self.registry
            .list_candidates(symbol)
            .into_iter()
            .filter(|id| {
                self.registry
                    .venue(id)
                    .is_some_and(|v| v.supports_order_type(order_type))
            })
            .collect()
    }

    /// Scoring, then balancing, then the primary.
    fn select(
        &self,
        candidates: &[VenueId],
        statuses: &std::collections::HashMap<VenueId, VenueStatus>,
    ) -> (VenueId, SelectionSource) {
        if self.settings.smart_routing {
            if let Some(venue) = self.optimizer.select_best(candidates, statuses) {
                return (venue, SelectionSource::Scoring);
            }
        }
        if self.settings.load_balancing {
            if let Some(venue) = self.balancer.select(candidates) {
                return (venue, SelectionSource::LoadBalancer);
            }
        }
        (self.settings.primary.clone(), SelectionSource::Primary)
    }

    // Background operations

    /// Probe every enabled venue once.
    pub async fn run_health_cycle(&self) -> Vec<HealthCheck> {
        self.health.run_cycle().await
    }

    /// Publish in-flight counts as venue load and nudge balancer weights.
    pub fn rebalance(&self) -> Vec<WeightAdjustment> {
        let active = self.balancer.active_snapshot();
        for venue in self.registry.venues() {
            let load = active.get(&venue.id).copied().unwrap_or(0) as f64;
            if let Err(e) = self.registry.update(&venue.id, |s| s.current_load = load) {
                warn!(error = %e, "Load publish failed");
            }
        }

        let capacities: Vec<(VenueId, f64)> = self
            .registry
            .enabled_venues()
            .into_iter()
            .map(|v| (v.id, v.capacity))
            .collect();
        let adjustments = self
            .balancer
            .rebalance(&capacities, self.settings.balancer.rebalance);
        for adj in &adjustments {
            debug!(
                venue = %adj.venue,
                current = adj.current_share,
                ideal = adj.ideal_share,
                old_weight = adj.old_weight,
                new_weight = adj.new_weight,
                "Balancer weight adjusted"
            );
        }
        adjustments
    }

    /// Evaluate recovery and failover for every venue.
    pub async fn scan_failovers(&self) -> Vec<FailoverEvent> {
        self.failover.scan().await
    }

    pub fn optimize(&self) -> OptimizationResult {
        self.optimizer.optimize()
    }

    pub fn capture_snapshot(&self) -> PerformanceSnapshot {
        let since = Utc::now() - chrono::Duration::hours(1);
        let failovers = self.failover.events_since(since);
        self.metrics
            .capture_snapshot(&self.registry.snapshot(), failovers)
    }

    pub fn refresh_metrics(&self) -> RoutingMetrics {
        self.metrics.refresh(&self.failover.history())
    }

    /// Manually fail a venue over; cooldown and cap still apply.
    pub async fn force_failover(
        &self,
        venue: &VenueId,
    ) -> std::result::Result<FailoverEvent, RoutingError> {
        self.failover.force(venue).await
    }

    // Lifecycle

    /// Spawn the background tasks.
    pub async fn start(self: &Arc<Self>) -> std::result::Result<(), RoutingError> {
        if !self.settings.enabled {
            return Err(RoutingError::Disabled);
        }
        let mut tasks = self.tasks.lock().await;
        if tasks.is_some() {
            return Err(RoutingError::AlreadyRunning);
        }

        let weak = Arc::downgrade(self);
        let mut group = TaskGroup::new();
        spawn_router_task(&mut group, &weak, "health", self.settings.health.interval, |r| async move {
            r.run_health_cycle().await;
        });
        spawn_router_task(
            &mut group,
            &weak,
            "rebalance",
            self.settings.balancer.rebalance_interval,
            |r| async move {
                r.rebalance();
            },
        );
        if self.settings.auto_failover {
            spawn_router_task(
                &mut group,
                &weak,
                "failover",
                self.settings.failover.scan_interval,
                |r| async move {
                    r.scan_failovers().await;
                },
            );
        }
        spawn_router_task(&mut group, &weak, "optimizer", self.settings.optimizer.interval, |r| async move {
            r.optimize();
        });
        spawn_router_task(
            &mut group,
            &weak,
            "snapshot",
            self.settings.metrics.snapshot_interval,
            |r| async move {
                r.capture_snapshot();
            },
        );
        spawn_router_task(&mut group, &weak, "metrics", self.settings.metrics.interval, |r| async move {
            r.refresh_metrics();
        });

        info!(tasks = ?group.names(), "Router started");
        *tasks = Some(group);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Stop the background tasks and wait for them to finish.
    pub async fn stop(&self) -> std::result::Result<(), RoutingError> {
        let mut tasks = self.tasks.lock().await;
        let group = tasks.take().ok_or(RoutingError::NotRunning)?;
        group.shutdown().await;
        self.running.store(false, Ordering::SeqCst);
        info!("Router stopped");
        Ok(())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // Queries

    #[must_use]
    pub fn status(&self) -> RouterStatus {
        RouterStatus {
            running: self.is_running(),
            enabled: self.settings.enabled,
            smart_routing: self.settings.smart_routing,
            auto_failover: self.settings.auto_failover,
            load_balancing: self.settings.load_balancing,
            primary_venue: self.settings.primary.clone(),
            backup_venues: self.settings.backups.clone(),
            venue_count: self.registry.len(),
            online_venues: self.registry.online_count(),
            rule_count: self.rules.len(),
            decision_count: self.metrics.decision_count(),
            failover_count: self.failover.history_len(),
            optimization_count: self.optimizer.history_len(),
            snapshot_count: self.metrics.snapshot_count(),
            metrics: self.metrics.metrics(),
        }
    }

    pub fn venue_status(&self, venue: &VenueId) -> std::result::Result<VenueStatus, RoutingError> {
        self.registry.get(venue)
    }

    /// Every venue status in catalog order.
    #[must_use]
    pub fn venue_statuses(&self) -> Vec<VenueStatus> {
        self.registry.snapshot()
    }

    pub fn health_history(
        &self,
        venue: &VenueId,
        limit: usize,
    ) -> std::result::Result<Vec<HealthCheck>, RoutingError> {
        self.health.history(venue, limit)
    }

    /// Metrics as of the last refresh.
    #[must_use]
    pub fn routing_metrics(&self) -> RoutingMetrics {
        self.metrics.metrics()
    }

    pub fn set_venue_enabled(
        &self,
        venue: &VenueId,
        enabled: bool,
    ) -> std::result::Result<(), RoutingError> {
        self.registry.set_enabled(venue, enabled)
    }

    /// Returns false for an unknown rule.
    pub fn set_rule_active(&self, rule: &RuleId, active: bool) -> bool {
        self.rules.set_active(rule, active)
    }

    /// Rules in evaluation order with their counters.
    #[must_use]
    pub fn rules(&self) -> Vec<RoutingRule> {
        self.rules.rules()
    }

    /// The `limit` most recent decisions, oldest first. Zero means all.
    #[must_use]
    pub fn decisions(&self, limit: usize) -> Vec<RoutingDecision> {
        self.metrics.decisions(limit)
    }

    #[must_use]
    pub fn failover_history(&self) -> Vec<FailoverEvent> {
        self.failover.history()
    }

    #[must_use]
    pub fn optimization_history(&self) -> Vec<OptimizationResult> {
        self.optimizer.history()
    }

    #[must_use]
    pub fn performance_history(&self) -> Vec<PerformanceSnapshot> {
        self.metrics.snapshots()
    }

    #[must_use]
    pub fn balancer_weight(&self, venue: &VenueId) -> f64 {
        self.balancer.weight(venue)
    }
}

/// Spawn a periodic task that runs `work` while the router is alive.
fn spawn_router_task<F, Fut>(
    group: &mut TaskGroup,
    router: &Weak<Router>,
    name: &'static str,
    period: Duration,
    work: F,
) where
    F: Fn(Arc<Router>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let router = router.clone();
    group.spawn_periodic(name, period, move || {
        let tick = router.upgrade().map(&work);
        async move {
            if let Some(tick) = tick {
                tick.await;
            }
        }
    });
}

#[async_trait]
impl OrderRouter for Router {
    async fn route_order(&self, order_id: OrderId, symbol: &str, order_type: &str) -> RouteOutcome {
        Router::route_order(self, order_id, symbol, order_type).await
    }

    fn status(&self) -> RouterStatus {
        Router::status(self)
    }

    fn venue_status(&self, venue: &VenueId) -> std::result::Result<VenueStatus, RoutingError> {
        Router::venue_status(self, venue)
    }

    fn health_history(
        &self,
        venue: &VenueId,
        limit: usize,
    ) -> std::result::Result<Vec<HealthCheck>, RoutingError> {
        Router::health_history(self, venue, limit)
    }

    fn routing_metrics(&self) -> RoutingMetrics {
        Router::routing_metrics(self)
    }
}
