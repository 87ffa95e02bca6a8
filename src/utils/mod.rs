//! This module aggregates the utility submodules shared by the commands.

/// Environment-driven bot configuration.
pub mod config;
/// Per-guild embed themes persisted to a JSON file.
pub mod theme_store;
