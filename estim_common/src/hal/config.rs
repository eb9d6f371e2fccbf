//! Switch-matrix wiring configuration.
//!
//! The topology (4 groups × 4 channels, one selector pair per intra-group
//! position, one latch-enable per group, one master output-enable) is fixed
//! at design time. `MatrixConfig` only carries the physical line numbers,
//! the output-enable polarity and the latch hold time.

use crate::consts::{CHANNELS_PER_GROUP, DEFAULT_LATCH_HOLD_US, GROUP_COUNT, MAX_LATCH_HOLD_US};
use crate::hal::driver::HalError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_output_enable_pin() -> u32 {
    22
}

fn default_latch_enable_pins() -> [u32; GROUP_COUNT] {
    [23, 24, 25, 27]
}

fn default_selector_pins() -> [[u32; 2]; CHANNELS_PER_GROUP] {
    [[5, 6], [12, 13], [16, 17], [19, 26]]
}

fn default_latch_hold_us() -> u64 {
    DEFAULT_LATCH_HOLD_US
}

/// Wiring configuration loaded from the `[matrix]` table of `matrix.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Line number of the master output-enable.
    #[serde(default = "default_output_enable_pin")]
    pub output_enable_pin: u32,

    /// Logic level at which output-enable makes the latched states visible.
    /// The opposite level is asserted while the latches are programmed.
    #[serde(default)]
    pub output_enable_active_high: bool,

    /// Latch-enable line per group (group 0 = channels 1..=4).
    #[serde(default = "default_latch_enable_pins")]
    pub latch_enable_pins: [u32; GROUP_COUNT],

    /// Selector pair `[bit0, bit1]` per intra-group position.
    #[serde(default = "default_selector_pins")]
    pub selector_pins: [[u32; 2]; CHANNELS_PER_GROUP],

    /// Latch-enable high time in microseconds (busy-wait).
    #[serde(default = "default_latch_hold_us")]
    pub latch_hold_us: u64,
}

impl MatrixConfig {
    /// Raw output-enable level that hides the latch outputs.
    #[inline]
    pub const fn output_enable_inactive_level(&self) -> bool {
        !self.output_enable_active_high
    }

    /// Raw output-enable level that shows the latch outputs.
    #[inline]
    pub const fn output_enable_active_level(&self) -> bool {
        self.output_enable_active_high
    }

    /// Every configured line number.
    pub fn all_pins(&self) -> Vec<u32> {
        let mut pins = Vec::with_capacity(1 + GROUP_COUNT + 2 * CHANNELS_PER_GROUP);
        pins.push(self.output_enable_pin);
        pins.extend_from_slice(&self.latch_enable_pins);
        for pair in &self.selector_pins {
            pins.extend_from_slice(pair);
        }
        pins
    }

    /// Validate the wiring configuration.
    ///
    /// # Validation Rules
    /// 1. All line numbers distinct
    /// 2. `0 < latch_hold_us <= MAX_LATCH_HOLD_US`
    pub fn validate(&self) -> Result<(), HalError> {
        let mut seen = HashSet::new();
        for pin in self.all_pins() {
            if !seen.insert(pin) {
                return Err(HalError::ConfigError(format!(
                    "Line {pin} is assigned more than once"
                )));
            }
        }

        if self.latch_hold_us == 0 || self.latch_hold_us > MAX_LATCH_HOLD_US {
            return Err(HalError::ConfigError(format!(
                "latch_hold_us must be in 1..={MAX_LATCH_HOLD_US} (got {})",
                self.latch_hold_us
            )));
        }

        Ok(())
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            output_enable_pin: default_output_enable_pin(),
            output_enable_active_high: false,
            latch_enable_pins: default_latch_enable_pins(),
            selector_pins: default_selector_pins(),
            latch_hold_us: default_latch_hold_us(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MatrixConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.all_pins().len(), 13);
        assert!(config.output_enable_inactive_level());
        assert!(!config.output_enable_active_level());
    }

    #[test]
    fn duplicate_pin_rejected() {
        let config = MatrixConfig {
            latch_enable_pins: [23, 24, 25, 5],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Line 5"));
    }

    #[test]
    fn latch_hold_bounds() {
        let zero = MatrixConfig {
            latch_hold_us: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let long = MatrixConfig {
            latch_hold_us: MAX_LATCH_HOLD_US + 1,
            ..Default::default()
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: MatrixConfig = toml::from_str(
            r#"
output_enable_active_high = true
latch_hold_us = 3
"#,
        )
        .unwrap();
        assert!(config.output_enable_active_high);
        assert_eq!(config.latch_hold_us, 3);
        assert_eq!(config.selector_pins, default_selector_pins());
    }
}
