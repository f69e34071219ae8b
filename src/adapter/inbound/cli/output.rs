//! Terminal output helpers.
//!
//! Human-readable sections and fields by default; a single JSON document on
//! stdout when `--json` is set. Logs go to stderr either way.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::error::Result;

static JSON: AtomicBool = AtomicBool::new(false);

/// Switch every handler to JSON output.
pub fn set_json(json: bool) {
    JSON.store(json, Ordering::Relaxed);
}

#[must_use]
pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

pub fn section(title: &str) {
    if !is_json() {
        println!();
        println!("{title}");
    }
}

pub fn field(label: &str, value: impl Display) {
    if !is_json() {
        println!("  {label:<18} {value}");
    }
}

pub fn success(message: &str) {
    if !is_json() {
        println!("  ✓ {message}");
    }
}

pub fn warning(message: &str) {
    if !is_json() {
        println!("  ! {message}");
    }
}

/// Print `value` as pretty JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
