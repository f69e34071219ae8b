//! Outbound adapters (driven side).

pub mod env_credentials;
pub mod simulated;
