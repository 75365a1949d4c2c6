//! Parsing and validation of `regblock.toml` generation settings.
//!
//! This crate reads the generation configuration file and produces a
//! strongly-typed [`RegblockConfig`] describing the bus interface width,
//! clocking and default reset style, and external-path retiming options.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::{ClockingConfig, CpuifConfig, ExternalConfig, RegblockConfig};
