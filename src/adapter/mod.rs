//! Adapters around the router core.
//!
//! - [`inbound`] - The command-line interface driving the router
//! - [`outbound`] - Venue clients and credential sources the router drives

pub mod inbound;
pub mod outbound;
