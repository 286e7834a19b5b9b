//! `registry-query`: a command-line client for a service registry.
//!
//! Loads a TOML configuration, builds a transport-client factory from its
//! TLS settings, and issues one query against the configured endpoint.

pub mod commands;
pub mod config;

pub use commands::{run, CliConfig, Command};
pub use config::{LogFormat, LoggingConfig, QueryConfig};
