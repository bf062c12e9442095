//! Builders for client configuration.

pub mod config;

pub use config::{tsdb_config, ConfigBuilder};
