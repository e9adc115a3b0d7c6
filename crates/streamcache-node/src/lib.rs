//! Wiring for the `streamcache-node` binary: configuration, observability,
//! command-line interface and the commands themselves.

pub mod cli;
pub mod commands;
pub mod config;
pub mod observability;
pub mod output;

pub use config::AppConfig;
