//! # Conveyor Config
//!
//! Layered configuration for the Conveyor processes: defaults from
//! `config/default.toml`, environment-specific overrides, a local override
//! file, and finally `CONVEYOR__*` environment variables.

mod app_config;
mod loader;

pub use app_config::*;
pub use loader::*;
