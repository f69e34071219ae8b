//! Runtime loop used by the binary.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::info;

use crate::application::Router;
use crate::domain::{OrderId, RoutingMetrics};
use crate::error::Result;

/// Start the router, wait for `shutdown`, stop it and return final metrics.
pub async fn run_until<F>(router: Arc<Router>, shutdown: F) -> Result<RoutingMetrics>
where
    F: Future<Output = ()>,
{
    router.start().await?;
    info!("Router running, waiting for shutdown signal");
    shutdown.await;
    info!("Shutdown signal received");
    router.stop().await?;
    Ok(router.refresh_metrics())
}

/// Probe once, then route `orders` orders concurrently and return metrics.
pub async fn simulate(
    router: &Router,
    orders: usize,
    symbol: &str,
    order_type: &str,
) -> RoutingMetrics {
    router.run_health_cycle().await;
    let routed = join_all((0..orders).map(move |i| {
        router.route_order(OrderId::new(format!("sim-{i}")), symbol, order_type)
    }))
    .await;
    let failed = routed.iter().filter(|o| !o.is_ok()).count();
    info!(orders, failed, "Simulation complete");
    router.capture_snapshot();
    router.refresh_metrics()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::infrastructure::bootstrap::build_router;
    use crate::testkit::config::{fast_collaborators, fast_config};

    #[tokio::test]
    async fn run_until_starts_and_stops() {
        let router = build_router(&fast_config(), fast_collaborators().0).unwrap();
        let metrics = run_until(router.clone(), tokio::time::sleep(Duration::from_millis(30)))
            .await
            .unwrap();
        assert!(!router.is_running());
        assert_eq!(metrics.total_decisions, 0);
    }

    #[tokio::test]
    async fn simulate_routes_every_order() {
        let router = build_router(&fast_config(), fast_collaborators().0).unwrap();
        let metrics = simulate(&router, 20, "BTCUSDT", "LIMIT").await;
        assert_eq!(metrics.total_decisions, 20);
        assert_eq!(metrics.success_rate, 1.0);
        assert_eq!(router.performance_history().len(), 1);
    }
}
