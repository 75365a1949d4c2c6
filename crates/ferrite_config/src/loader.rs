//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::RegblockConfig;
use std::path::Path;

/// Loads and validates a `regblock.toml` configuration from a project
/// directory.
pub fn load_config(project_dir: &Path) -> Result<RegblockConfig, ConfigError> {
    let config_path = project_dir.join("regblock.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<RegblockConfig, ConfigError> {
    let config: RegblockConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are consistent.
fn validate_config(config: &RegblockConfig) -> Result<(), ConfigError> {
    let dw = config.cpuif.data_width;
    if !dw.is_power_of_two() || dw < 8 {
        return Err(ConfigError::ValidationError(format!(
            "cpuif.data_width must be a power of two and at least 8, got {dw}"
        )));
    }
    if let Some(aw) = config.cpuif.addr_width {
        if aw == 0 || aw > 64 {
            return Err(ConfigError::ValidationError(format!(
                "cpuif.addr_width must be between 1 and 64, got {aw}"
            )));
        }
    }
    if config.clocking.clock.is_empty() {
        return Err(ConfigError::ValidationError(
            "clocking.clock must not be empty".to_string(),
        ));
    }
    if config.clocking.reset.is_empty() {
        return Err(ConfigError::ValidationError(
            "clocking.reset must not be empty".to_string(),
        ));
    }
    Ok(())
}
