//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration (server settings,
//! output mode, and mapping profiles), supplies defaults on first run, and
//! writes it back on request.

pub mod config;
