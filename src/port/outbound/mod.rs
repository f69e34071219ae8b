//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the venue-facing collaborators the router
//! depends on: probing, execution, failover transitions and credentials.

pub mod credentials;
pub mod execution;
pub mod failover;
pub mod probe;
