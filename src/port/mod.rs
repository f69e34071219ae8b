//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!      OrderRouter ──▶      Application        │
//!                    │  registry · health ·    │
//!                    │  balancer · failover ·  │
//!                    │  rules · optimizer      │
//!                    └───────────┬─────────────┘
//!            ┌───────────────┬───┴───────────┬───────────────┐
//!            ▼               ▼               ▼               ▼
//!     ┌────────────┐  ┌────────────┐  ┌────────────┐  ┌────────────┐
//!     │  Prober    │  │  Executor  │  │  Failover  │  │ Credential │
//!     │  Adapter   │  │  Adapter   │  │  Adapter   │  │  Adapter   │
//!     └────────────┘  └────────────┘  └────────────┘  └────────────┘
//! ```

pub mod inbound;
pub mod outbound;

pub use inbound::router::{OrderRouter, RouteOutcome, RouterStatus};
pub use outbound::credentials::{CredentialProvider, Credentials};
pub use outbound::execution::{ExecutionReport, OrderExecutor};
pub use outbound::failover::FailoverExecutor;
pub use outbound::probe::VenueProber;
