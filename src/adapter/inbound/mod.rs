//! Inbound adapters: the command-line entry point.

pub mod cli;
