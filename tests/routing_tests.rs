//! End-to-end routing through the public router API.

mod support;

use std::time::{Duration, Instant};

use venue_router::domain::{
    latency_score, ActionKind, ComponentScores, OrderId, RuleId, SelectionSource,
};
use venue_router::error::RoutingError;
use venue_router::testkit::config::fast_settings;
use venue_router::testkit::domain::{always, avoid, route_when_healthy, venue_id};

use support::router;

#[test]
fn latency_score_anchor_points() {
    assert_eq!(latency_score(Duration::from_millis(100)), 1.0);
    assert_eq!(latency_score(Duration::from_millis(500)), 0.5);
    let at_one_second = latency_score(Duration::from_millis(1_000));
    assert!((0.0..0.5).contains(&at_one_second));

    let mut previous = f64::MAX;
    for ms in (0..5_000).step_by(25) {
        let score = latency_score(Duration::from_millis(ms));
        assert!(score >= 0.0, "negative score at {ms}ms");
        assert!(score <= previous, "score rose at {ms}ms");
        previous = score;
    }
}

#[test]
fn overall_score_is_the_component_mean() {
    let scores = ComponentScores {
        latency: 0.8,
        reliability: 0.6,
        cost: 1.0,
        liquidity: 0.4,
    };
    assert_eq!(scores.overall(), 0.7);
}

#[tokio::test]
async fn unknown_symbol_has_no_available_venue() {
    let (router, rig) = router(fast_settings(), Vec::new());

    let outcome = router
        .route_order(OrderId::new("o-1"), "DOGEUSDT", "LIMIT")
        .await;

    assert_eq!(
        outcome.error,
        Some(RoutingError::NoAvailableVenue {
            symbol: "DOGEUSDT".into()
        })
    );
    assert!(!outcome.decision.success);
    assert!(outcome.decision.selected_venue.is_none());
    assert!(rig.executor.executed().is_empty());

    let recorded = router.decisions(0);
    assert_eq!(recorded.len(), 1);
    assert!(!recorded[0].success);
}

#[tokio::test]
async fn unsupported_order_type_has_no_available_venue() {
    let (router, _) = router(fast_settings(), Vec::new());
    let outcome = router
        .route_order(OrderId::new("o-1"), "BTCUSDT", "ICEBERG")
        .await;
    assert!(matches!(
        outcome.error,
        Some(RoutingError::NoAvailableVenue { .. })
    ));
}

#[tokio::test]
async fn decision_lists_alternatives_and_timing() {
    let (router, _) = router(fast_settings(), Vec::new());

    let started = Instant::now();
    let outcome = router
        .route_order(OrderId::new("o-1"), "BTCUSDT", "LIMIT")
        .await;
    let wall = started.elapsed();

    assert_eq!(outcome.decision.selected_venue, Some(venue_id("binance")));
    assert_eq!(
        outcome.decision.alternatives,
        vec![venue_id("okx"), venue_id("bybit")]
    );
    assert!(outcome.decision.execution_time <= wall);
    assert_eq!(
        router.decisions(1)[0].execution_time,
        outcome.decision.execution_time
    );
}

#[tokio::test]
async fn avoided_venue_is_not_an_alternative() {
    let rules = vec![avoid("skip_binance", 1, "binance")];
    let (router, _) = router(fast_settings(), rules);

    let outcome = router
        .route_order(OrderId::new("o-1"), "BTCUSDT", "LIMIT")
        .await;
    let selected = outcome.decision.selected_venue.clone().unwrap();
    assert!(!outcome.decision.alternatives.contains(&selected));
    assert!(!outcome.decision.alternatives.contains(&venue_id("binance")));
    assert_eq!(outcome.decision.alternatives.len(), 1);
}

#[tokio::test]
async fn route_to_rule_wins_over_scoring() {
    let rules = vec![route_when_healthy("prefer_bybit", 1, "bybit", 0.9)];
    let (router, rig) = router(fast_settings(), rules);

    let outcome = router
        .route_order(OrderId::new("o-1"), "ETHUSDT", "MARKET")
        .await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.decision.source, SelectionSource::Rule);
    assert_eq!(outcome.decision.selected_venue, Some(venue_id("bybit")));
    assert_eq!(outcome.decision.matched_rules, vec![RuleId::new("prefer_bybit")]);
    assert_eq!(rig.executor.venues(), vec![venue_id("bybit")]);

    let rule = &router.rules()[0];
    assert_eq!(rule.hit_count, 1);
    assert_eq!(rule.success_count, 1);
}

#[tokio::test]
async fn avoid_narrows_one_evaluation_without_touching_the_registry() {
    let rules = vec![avoid("skip_binance", 1, "binance")];
    let (router, _) = router(fast_settings(), rules);

    let outcome = router
        .route_order(OrderId::new("o-1"), "BTCUSDT", "LIMIT")
        .await;
    assert!(outcome.is_ok());
    assert_ne!(outcome.decision.selected_venue, Some(venue_id("binance")));

    let status = router.venue_status(&venue_id("binance")).unwrap();
    assert!(status.online);
    assert!(status.is_routable());

    assert!(router.set_rule_active(&RuleId::new("skip_binance"), false));
    let outcome = router
        .route_order(OrderId::new("o-2"), "BTCUSDT", "LIMIT")
        .await;
    assert_eq!(outcome.decision.selected_venue, Some(venue_id("binance")));
}

#[tokio::test]
async fn rejected_execution_is_recorded_and_surfaced() {
    let (router, rig) = router(fast_settings(), Vec::new());
    rig.executor.reject_on(&venue_id("binance"));

    let outcome = router
        .route_order(OrderId::new("o-1"), "BTCUSDT", "LIMIT")
        .await;

    assert!(matches!(
        outcome.error,
        Some(RoutingError::ExecutionFailure { ref venue, .. }) if *venue == venue_id("binance")
    ));
    assert!(!outcome.decision.success);
    assert!(outcome.decision.error.is_some());
    assert!(!router.decisions(1)[0].success);
}

#[tokio::test]
async fn executor_error_is_an_execution_failure() {
    let (router, rig) = router(fast_settings(), Vec::new());
    rig.executor.error_on(&venue_id("binance"));

    let outcome = router
        .route_order(OrderId::new("o-1"), "BTCUSDT", "LIMIT")
        .await;
    assert!(matches!(
        outcome.error,
        Some(RoutingError::ExecutionFailure { .. })
    ));
}

#[tokio::test]
async fn decision_history_trims_in_batches() {
    let rules = vec![always("balance", 1, ActionKind::LoadBalance)];
    let (router, _) = router(fast_settings(), rules);

    for i in 0..10_001 {
        router
            .route_order(OrderId::new(format!("o-{i}")), "BTCUSDT", "LIMIT")
            .await;
    }

    let history = router.decisions(0);
    assert!(history.len() <= 9_001, "history kept {}", history.len());
    assert_eq!(
        history.last().map(|d| d.order_id.clone()),
        Some(OrderId::new("o-10000"))
    );
}

#[tokio::test]
async fn metrics_refresh_counts_decisions() {
    let (router, _) = router(fast_settings(), Vec::new());
    for i in 0..4 {
        router
            .route_order(OrderId::new(format!("o-{i}")), "BTCUSDT", "LIMIT")
            .await;
    }
    router
        .route_order(OrderId::new("o-x"), "XRPUSDT", "LIMIT")
        .await;

    let metrics = router.refresh_metrics();
    assert_eq!(metrics.total_decisions, 5);
    assert_eq!(metrics.successful, 4);
    assert_eq!(metrics.failed, 1);
    assert_eq!(router.routing_metrics(), metrics);
}
