//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the client's TOML file, fills in defaults
//! for anything missing, and can write a complete file back for the user to
//! edit.

pub mod config;
