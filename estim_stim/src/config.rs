//! `stim.toml` file configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "stim"
//!
//! [stimulation]
//! amplitude = { value = 100, unit = "uA" }
//! event_count = 3
//! inter_event_gap = { value = 100, unit = "us" }
//! train_count = 2
//! train_duration = { value = 2, unit = "ms" }
//!
//! [stimulation.waveform]
//! kind = "monophasic"
//! pulse_duration = { value = 100, unit = "us" }
//!
//! [device]
//! stim_channel = 0
//! sync_out = 0
//! trigger = 1
//! sign_bit = 15
//! ```

use estim_common::config::{ConfigError, SharedConfig};
use estim_common::consts::DEFAULT_SIGN_BIT;
use estim_common::stim::StimulationConfig;
use estim_common::stim::StimError;
use estim_common::stim::dat::DatLayout;
use estim_common::stim::encoding::SignMagnitude;
use serde::{Deserialize, Serialize};

fn default_trigger() -> u32 {
    1
}

fn default_sign_bit() -> u8 {
    DEFAULT_SIGN_BIT
}

/// Stimulator addressing and word format, the `[device]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device channel receiving the stimulation sequence.
    #[serde(default)]
    pub stim_channel: u32,

    /// Sync output receiving the sync sequence.
    #[serde(default)]
    pub sync_out: u32,

    /// Trigger used for start / stop.
    #[serde(default = "default_trigger")]
    pub trigger: u32,

    /// Amplitude sign bit (12..=15).
    #[serde(default = "default_sign_bit")]
    pub sign_bit: u8,

    /// Channel blocks of the `.dat` export.
    #[serde(default)]
    pub dat: DatLayout,
}

impl DeviceConfig {
    /// Amplitude encoder for this device.
    pub fn encoder(&self) -> Result<SignMagnitude, StimError> {
        SignMagnitude::new(self.sign_bit)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            stim_channel: 0,
            sync_out: 0,
            trigger: default_trigger(),
            sign_bit: default_sign_bit(),
            dat: DatLayout::default(),
        }
    }
}

/// Root of `stim.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct StimFileConfig {
    pub shared: SharedConfig,
    pub stimulation: StimulationConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

impl StimFileConfig {
    /// Validate every section without generating the program.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.stimulation
            .normalize()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.device
            .encoder()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.device
            .dat
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(())
    }
}
