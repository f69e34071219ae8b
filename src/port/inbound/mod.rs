//! Inbound (driving) ports consumed by inbound adapters.
//!
//! - [`router`]: order routing and read-only router state

pub mod router;
