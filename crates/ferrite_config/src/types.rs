//! Configuration types for register-block generation.

use serde::{Deserialize, Serialize};

/// The complete generation configuration, usually loaded from
/// `regblock.toml`. Every section and key is optional and falls back to a
/// conventional default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegblockConfig {
    /// Software bus interface settings.
    #[serde(default)]
    pub cpuif: CpuifConfig,
    /// Clock and default reset naming and style.
    #[serde(default)]
    pub clocking: ClockingConfig,
    /// External-access path options.
    #[serde(default)]
    pub external: ExternalConfig,
}

/// Software bus interface settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuifConfig {
    /// Bus data width in bits. Must be a power of two and at least 8.
    #[serde(default = "default_data_width")]
    pub data_width: u32,
    /// Bus address width in bits. Defaults to the smallest width that
    /// spans the top address map.
    #[serde(default)]
    pub addr_width: Option<u32>,
}

impl Default for CpuifConfig {
    fn default() -> Self {
        Self {
            data_width: default_data_width(),
            addr_width: None,
        }
    }
}

/// Clock and default reset naming and style.
///
/// A field whose reset specification names its own reset signal overrides
/// this default per field; everything else resets under the style given
/// here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockingConfig {
    /// Name of the clock input.
    #[serde(default = "default_clock")]
    pub clock: String,
    /// Name of the default reset input.
    #[serde(default = "default_reset")]
    pub reset: String,
    /// The default reset asserts low.
    #[serde(default)]
    pub reset_active_low: bool,
    /// The default reset is asynchronous.
    #[serde(default)]
    pub reset_async: bool,
}

impl Default for ClockingConfig {
    fn default() -> Self {
        Self {
            clock: default_clock(),
            reset: default_reset(),
            reset_active_low: false,
            reset_async: false,
        }
    }
}

/// External-access path options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExternalConfig {
    /// Insert one register stage on outgoing external register requests.
    #[serde(default)]
    pub retime_reg: bool,
    /// Insert one register stage on outgoing external memory requests.
    #[serde(default)]
    pub retime_mem: bool,
}

fn default_data_width() -> u32 {
    32
}

fn default_clock() -> String {
    "clk".to_string()
}

fn default_reset() -> String {
    "rst".to_string()
}
