//! Load balancing and weight optimisation through the router.

mod support;

use std::collections::HashMap;

use venue_router::application::BalancingAlgorithm;
use venue_router::domain::{OrderId, SelectionSource, VenueId};
use venue_router::testkit::domain::venue_id;
use venue_router::testkit::prober::degraded_report;

use support::{balancer_only, router};

async fn route_many(router: &venue_router::application::Router, n: usize) -> Vec<VenueId> {
    let mut picks = Vec::with_capacity(n);
    for i in 0..n {
        let outcome = router
            .route_order(OrderId::new(format!("o-{i}")), "BTCUSDT", "LIMIT")
            .await;
        assert_eq!(outcome.decision.source, SelectionSource::LoadBalancer);
        picks.extend(outcome.decision.selected_venue);
    }
    picks
}

#[tokio::test]
async fn round_robin_cycles_the_catalog() {
    let mut settings = balancer_only();
    settings.balancer.algorithm = BalancingAlgorithm::RoundRobin;
    let (router, _) = router(settings, Vec::new());

    let picks = route_many(&router, 6).await;
    let expected: Vec<VenueId> = ["binance", "okx", "bybit", "binance", "okx", "bybit"]
        .into_iter()
        .map(venue_id)
        .collect();
    assert_eq!(picks, expected);
}

#[tokio::test]
async fn weighted_follows_inverse_priority() {
    let (router, _) = router(balancer_only(), Vec::new());

    let trials = 10_000;
    let mut counts: HashMap<VenueId, usize> = HashMap::new();
    for venue in route_many(&router, trials).await {
        *counts.entry(venue).or_default() += 1;
    }

    // Weights 1, 1/2, 1/3 give binance 6/11 of the traffic.
    let binance = counts[&venue_id("binance")] as f64 / trials as f64;
    assert!((0.50..0.59).contains(&binance), "binance share {binance}");
    assert!(counts[&venue_id("okx")] > counts[&venue_id("bybit")]);
}

#[tokio::test]
async fn least_connections_prefers_catalog_order_when_idle() {
    let mut settings = balancer_only();
    settings.balancer.algorithm = BalancingAlgorithm::LeastConnections;
    let (router, _) = router(settings, Vec::new());

    let picks = route_many(&router, 3).await;
    assert!(picks.iter().all(|v| *v == venue_id("binance")));
}

#[tokio::test]
async fn rebalance_publishes_load_and_leaves_idle_weights() {
    let (router, _) = router(balancer_only(), Vec::new());
    route_many(&router, 5).await;

    assert!(router.rebalance().is_empty());
    for status in router.venue_statuses() {
        assert_eq!(status.current_load, 0.0);
    }
    assert_eq!(router.balancer_weight(&venue_id("binance")), 1.0);
}

#[tokio::test]
async fn optimizer_shifts_weight_away_from_a_degraded_venue() {
    let (router, rig) = router(balancer_only(), Vec::new());
    rig.prober.set(&venue_id("okx"), degraded_report());
    router.run_health_cycle().await;

    let result = router.optimize();

    let okx = result.target_for(&venue_id("okx")).unwrap();
    let binance = result.target_for(&venue_id("binance")).unwrap();
    assert!(okx < binance, "okx {okx} binance {binance}");
    assert!(router.balancer_weight(&venue_id("okx")) < router.balancer_weight(&venue_id("binance")));
    assert_eq!(router.optimization_history().len(), 1);
}
