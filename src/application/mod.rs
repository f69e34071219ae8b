//! Application services (use cases).
//!
//! These services own the router's shared state and coordinate the ports
//! to implement routing, health tracking, balancing and failover.

pub mod balancer;
pub mod failover;
pub mod health;
pub mod metrics;
pub mod optimizer;
pub mod registry;
pub mod router;
pub mod rules;
pub mod supervisor;

pub use balancer::{BalancingAlgorithm, LoadBalancer, RebalanceSettings, WeightAdjustment};
pub use failover::{FailoverController, FailoverSettings};
pub use health::{HealthMonitor, HealthSettings};
pub use metrics::MetricsCollector;
pub use optimizer::{OptimizerSettings, RoutingOptimizer};
pub use registry::VenueRegistry;
pub use router::{BalancerSettings, Collaborators, MetricsSettings, Router, RouterSettings};
pub use rules::{RuleDelegate, RuleEngine, RuleEvaluation};
pub use supervisor::TaskGroup;
