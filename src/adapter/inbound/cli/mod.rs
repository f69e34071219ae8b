//! CLI module graph.

pub mod check;
pub mod command;
pub mod output;
pub mod run;
pub mod simulate;

use std::path::Path;

use crate::error::Result;
use crate::infrastructure::config::Config;

/// Load and validate `path`, or the built-in defaults when absent.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => {
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
