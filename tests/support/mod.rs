#![allow(dead_code)]

use std::sync::Arc;

use tempfile::NamedTempFile;

use venue_router::application::{Router, RouterSettings};
use venue_router::domain::RoutingRule;
use venue_router::testkit::config::{fast_settings, Rig};
use venue_router::testkit::domain::catalog;

/// Router over the three-venue test catalog with scripted collaborators.
pub fn router(settings: RouterSettings, rules: Vec<RoutingRule>) -> (Arc<Router>, Rig) {
    router_with_rig(settings, rules, Rig::new())
}

pub fn router_with_rig(
    settings: RouterSettings,
    rules: Vec<RoutingRule>,
    rig: Rig,
) -> (Arc<Router>, Rig) {
    let router = Router::new(settings, catalog(), rules, rig.collaborators())
        .expect("test router builds");
    (Arc::new(router), rig)
}

/// Fast settings with score selection off, so the balancer decides.
pub fn balancer_only() -> RouterSettings {
    let mut settings = fast_settings();
    settings.smart_routing = false;
    settings
}

pub fn write_config(contents: &str) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    std::fs::write(file.path(), contents).expect("write temp config");
    file
}

/// Poll `done` until it holds, failing after a generous deadline.
pub async fn eventually<F>(what: &str, mut done: F)
where
    F: FnMut() -> bool,
{
    let waited = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}
