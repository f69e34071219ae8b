//! Infrastructure configuration modules.

pub mod logging;
pub mod router;
pub mod rules;
pub mod settings;
pub mod venue;

pub use settings::Config;
