//! `matrix.toml` file configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "matrix"
//!
//! [matrix]
//! output_enable_pin = 22
//! latch_enable_pins = [23, 24, 25, 27]
//! selector_pins = [[5, 6], [12, 13], [16, 17], [19, 26]]
//! latch_hold_us = 1000
//!
//! [initial]
//! signals = "GGGGGGGGGGGGGGGG"
//! ```

use estim_common::channel::ChannelState;
use estim_common::config::{ConfigError, SharedConfig};
use estim_common::hal::config::MatrixConfig;
use serde::Deserialize;
use std::path::PathBuf;

fn default_driver() -> String {
    "simulation".to_string()
}

/// Root of `matrix.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixFileConfig {
    /// Common service settings.
    pub shared: SharedConfig,

    /// Wiring.
    #[serde(default)]
    pub matrix: MatrixConfig,

    /// Backend name in the driver registry.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Where the last committed state is kept between runs.
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// State committed right after startup.
    #[serde(default)]
    pub initial: Option<InitialState>,
}

/// `[initial]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct InitialState {
    /// 16-letter A/C/G/F string.
    pub signals: String,
}

impl MatrixFileConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.matrix
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        self.initial_state()?;
        Ok(())
    }

    /// Parsed `[initial] signals`, if present.
    pub fn initial_state(&self) -> Result<Option<ChannelState>, ConfigError> {
        self.initial
            .as_ref()
            .map(|initial| {
                ChannelState::parse_signals(&initial.signals)
                    .map_err(|e| ConfigError::ValidationError(format!("[initial] {e}")))
            })
            .transpose()
    }
}
