//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`prober`]: `ScriptedProber` plus canned healthy, degraded and failing
//!   probe reports.
//! - [`executor`]: `RecordingExecutor` and `RecordingFailoverExecutor`.
//! - [`domain`]: builders for venues, registries and rules.
//! - [`config`]: canonical test configurations.

pub mod config;
pub mod domain;
pub mod executor;
pub mod prober;
