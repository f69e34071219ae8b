//! Venue router - smart order routing across trading venues.
//!
//! Routes each order to one of several venues based on live health, latency,
//! load and fees, balances traffic between them and fails over away from
//! venues that degrade.
//!
//! # Architecture
//!
//! - **`domain`** - Venue catalog, statuses, rules, decisions, failover
//!   events and metrics as plain data with pure scoring functions
//! - **`port`** - Traits at the edges: order routing (inbound), probing,
//!   execution, failover transitions and credentials (outbound)
//! - **`application`** - Registry, health monitor, load balancer, failover
//!   controller, rule engine, optimizer, metrics and the [`Router`] that
//!   orchestrates them
//! - **`adapter`** - The CLI, simulated venue clients and env credentials
//! - **`infrastructure`** - Configuration, bootstrap and runtime
//!
//! # Example
//!
//! ```no_run
//! use venue_router::domain::OrderId;
//! use venue_router::infrastructure::bootstrap::{build_router, simulated_collaborators};
//! use venue_router::infrastructure::config::Config;
//!
//! # async fn example() -> venue_router::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! let router = build_router(&config, simulated_collaborators())?;
//! router.start().await?;
//!
//! let outcome = router.route_order(OrderId::new("o-1"), "BTCUSDT", "LIMIT").await;
//! println!("{:?}", outcome.decision.selected_venue);
//!
//! router.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Router`]: application::Router

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
