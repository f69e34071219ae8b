//! Health-driven failover and recovery through the router.

mod support;

use std::time::Duration;

use futures_util::future::join_all;

use venue_router::domain::{ConnectionState, FailoverTrigger, OrderId};
use venue_router::error::RoutingError;
use venue_router::testkit::config::{fast_settings, Rig};
use venue_router::testkit::domain::venue_id;
use venue_router::testkit::executor::RecordingFailoverExecutor;
use venue_router::testkit::prober::{degraded_report, healthy_report};

use support::{router, router_with_rig};

fn with_cooldown() -> venue_router::application::RouterSettings {
    let mut settings = fast_settings();
    settings.failover.cooldown = Duration::from_secs(60);
    settings
}

#[tokio::test]
async fn health_cycles_degrade_status() {
    let (router, rig) = router(fast_settings(), Vec::new());
    rig.prober.set(&venue_id("okx"), degraded_report());

    for _ in 0..3 {
        router.run_health_cycle().await;
    }

    let okx = router.venue_status(&venue_id("okx")).unwrap();
    assert_eq!(okx.connection, ConnectionState::Error);
    assert_eq!(okx.consecutive_failures, 3);
    assert!(okx.health_score < 0.8);
    assert_eq!(okx.availability, 0.0);

    let history = router.health_history(&venue_id("okx"), 2).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|c| !c.healthy));
    assert!(matches!(
        router.health_history(&venue_id("kraken"), 0),
        Err(RoutingError::VenueNotFound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scans_record_one_failover_per_cooldown() {
    let rig = Rig::with_failover(RecordingFailoverExecutor::with_delay(Duration::from_millis(50)));
    let (router, rig) = router_with_rig(with_cooldown(), Vec::new(), rig);
    rig.prober.set(&venue_id("binance"), degraded_report());
    for _ in 0..3 {
        router.run_health_cycle().await;
    }

    let scans = (0..8).map(|_| {
        let router = router.clone();
        tokio::spawn(async move { router.scan_failovers().await })
    });
    let events: Vec<_> = join_all(scans)
        .await
        .into_iter()
        .flat_map(|r| r.unwrap())
        .collect();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].from, venue_id("binance"));
    assert_eq!(events[0].trigger, FailoverTrigger::ConsecutiveFailures);
    assert_eq!(router.failover_history().len(), 1);
    assert_eq!(rig.failover.transitions().len(), 1);

    // Still degraded, but inside the cooldown.
    assert!(router.scan_failovers().await.is_empty());
    assert_eq!(router.failover_history().len(), 1);
}

#[tokio::test]
async fn failed_away_venue_is_skipped_then_recovers() {
    let (router, rig) = router(with_cooldown(), Vec::new());
    rig.prober.set(&venue_id("binance"), degraded_report());
    for _ in 0..3 {
        router.run_health_cycle().await;
    }
    let events = router.scan_failovers().await;
    assert_eq!(events.len(), 1);
    let target = events[0].to.clone().unwrap();
    assert_ne!(target, venue_id("binance"));

    let outcome = router
        .route_order(OrderId::new("o-1"), "BTCUSDT", "LIMIT")
        .await;
    assert!(outcome.is_ok());
    assert_ne!(outcome.decision.selected_venue, Some(venue_id("binance")));

    rig.prober.set(&venue_id("binance"), healthy_report());
    router.run_health_cycle().await;
    assert!(router.scan_failovers().await.is_empty());

    let binance = router.venue_status(&venue_id("binance")).unwrap();
    assert_eq!(binance.failed_over_to, None);
    let history = router.failover_history();
    assert!(history[0].auto_recovery);
    assert_eq!(rig.failover.restores(), vec![venue_id("binance")]);

    let err = router.force_failover(&venue_id("binance")).await.unwrap_err();
    assert!(matches!(err, RoutingError::FailoverCooldownActive { .. }));
}

#[tokio::test]
async fn failed_transition_is_recorded_but_not_applied() {
    let (router, rig) = router(fast_settings(), Vec::new());
    rig.failover.set_failing(true);

    let event = router.force_failover(&venue_id("okx")).await.unwrap();
    assert!(!event.success);
    assert!(event.error.is_some());
    assert_eq!(
        router.venue_status(&venue_id("okx")).unwrap().failed_over_to,
        None
    );
    assert_eq!(router.failover_history().len(), 1);
}

#[tokio::test]
async fn forcing_an_unknown_venue_fails() {
    let (router, _) = router(fast_settings(), Vec::new());
    assert_eq!(
        router.force_failover(&venue_id("kraken")).await.unwrap_err(),
        RoutingError::VenueNotFound {
            venue: venue_id("kraken")
        }
    );
}

#[tokio::test]
async fn timed_out_force_does_not_wedge_the_venue() {
    let rig = Rig::with_failover(RecordingFailoverExecutor::with_delay(Duration::from_millis(200)));
    let (router, _rig) = router_with_rig(fast_settings(), Vec::new(), rig);

    let first =
        tokio::time::timeout(Duration::from_millis(20), router.force_failover(&venue_id("okx")))
            .await;
    assert!(first.is_err());

    let second = router.force_failover(&venue_id("okx")).await.unwrap();
    assert!(second.success);
    assert_eq!(second.from, venue_id("okx"));
}
