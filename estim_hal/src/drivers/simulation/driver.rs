//! Simulated switch-matrix implementation.
//!
//! Models the digital lines and the four transparent latches:
//!
//! - while a group's LE is high, its latch follows the selector lines
//! - on the LE falling edge the selector codes are captured
//! - the captured roles reach the analog bus only while OE is at its
//!   active level; otherwise every channel reads as floating

use estim_common::channel::{ChannelRole, ChannelState, SelectorBits};
use estim_common::consts::{CHANNEL_COUNT, CHANNELS_PER_GROUP, GROUP_COUNT};
use estim_common::hal::config::MatrixConfig;
use estim_common::hal::driver::{DriverDiagnostics, HalError, SwitchMatrixBackend};
use tracing::{debug, info, trace};

/// One digital-line write, in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineWrite {
    /// Master output-enable driven to a raw level.
    OutputEnable(bool),
    /// Selector pair of an intra-group position.
    Selector {
        /// Intra-group position.
        position: usize,
        /// Code driven onto the pair.
        bits: SelectorBits,
    },
    /// Latch-enable of a group driven to a raw level.
    LatchEnable {
        /// Latch group.
        group: usize,
        /// Raw level.
        level: bool,
    },
}

/// Software model of the switch matrix.
pub struct SimulatedMatrix {
    /// Wiring (line numbers are used for trace output only)
    config: Option<MatrixConfig>,
    /// Raw output-enable level
    output_enable: bool,
    /// Current selector codes per position
    selectors: [SelectorBits; CHANNELS_PER_GROUP],
    /// Raw latch-enable levels per group
    latch_enable: [bool; GROUP_COUNT],
    /// Latched roles (index 0 = channel 1)
    latched: [ChannelRole; CHANNEL_COUNT],
    /// Every write since `init()`
    writes: Vec<LineWrite>,
    /// Completed latch pulses (falling edges)
    latch_pulses: u64,
}

impl SimulatedMatrix {
    /// Create an uninitialized simulated matrix.
    pub fn new() -> Self {
        Self {
            config: None,
            output_enable: false,
            selectors: [SelectorBits::empty(); CHANNELS_PER_GROUP],
            latch_enable: [false; GROUP_COUNT],
            latched: [ChannelRole::Floating; CHANNEL_COUNT],
            writes: Vec::new(),
            latch_pulses: 0,
        }
    }

    /// Roles captured in the latches, independent of OE.
    pub fn latched_roles(&self) -> ChannelState {
        ChannelState::from_roles(self.latched)
    }

    /// True while OE is at its active level.
    pub fn outputs_enabled(&self) -> bool {
        self.config
            .as_ref()
            .is_some_and(|c| self.output_enable == c.output_enable_active_level())
    }

    /// Roles seen on the analog bus.
    pub fn visible_roles(&self) -> ChannelState {
        if self.outputs_enabled() {
            self.latched_roles()
        } else {
            ChannelState::uniform(ChannelRole::Floating)
        }
    }

    /// Writes recorded since `init()`.
    pub fn writes(&self) -> &[LineWrite] {
        &self.writes
    }

    fn config(&self) -> Result<&MatrixConfig, HalError> {
        self.config.as_ref().ok_or(HalError::NotInitialized)
    }

    /// Copy the selector codes into the latch of `group`.
    fn follow(&mut self, group: usize) {
        let start = group * CHANNELS_PER_GROUP;
        for (position, bits) in self.selectors.iter().enumerate() {
            self.latched[start + position] = bits.role();
        }
    }
}

impl Default for SimulatedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl SwitchMatrixBackend for SimulatedMatrix {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, config: &MatrixConfig) -> Result<(), HalError> {
        info!(
            oe = config.output_enable_pin,
            le = ?config.latch_enable_pins,
            selectors = ?config.selector_pins,
            "Initializing simulated switch matrix"
        );
        *self = Self::new();
        // Lines come up with OE inactive and every latch closed.
        self.output_enable = config.output_enable_inactive_level();
        self.config = Some(config.clone());
        Ok(())
    }

    fn set_output_enable(&mut self, level: bool) -> Result<(), HalError> {
        let pin = self.config()?.output_enable_pin;
        trace!(pin, level, "OE");
        self.output_enable = level;
        self.writes.push(LineWrite::OutputEnable(level));
        Ok(())
    }

    fn set_selector_pair(&mut self, position: usize, bits: SelectorBits) -> Result<(), HalError> {
        let pins = *self
            .config()?
            .selector_pins
            .get(position)
            .ok_or_else(|| {
                HalError::CommunicationError(format!("No selector pair at position {position}"))
            })?;
        trace!(
            pin0 = pins[0],
            bit0 = bits.bit0(),
            pin1 = pins[1],
            bit1 = bits.bit1(),
            "Selector"
        );
        self.selectors[position] = bits;
        self.writes.push(LineWrite::Selector { position, bits });

        for group in 0..GROUP_COUNT {
            if self.latch_enable[group] {
                self.follow(group);
            }
        }
        Ok(())
    }

    fn set_latch_enable(&mut self, group: usize, level: bool) -> Result<(), HalError> {
        let pin = *self
            .config()?
            .latch_enable_pins
            .get(group)
            .ok_or_else(|| HalError::CommunicationError(format!("No latch for group {group}")))?;
        trace!(pin, group, level, "LE");

        let was_high = self.latch_enable[group];
        self.latch_enable[group] = level;
        self.writes.push(LineWrite::LatchEnable { group, level });

        if level {
            self.follow(group);
        } else if was_high {
            self.follow(group);
            self.latch_pulses += 1;
            debug!(group, "Latch captured");
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        info!(latch_pulses = self.latch_pulses, "Shutting down simulated switch matrix");
        self.config = None;
        Ok(())
    }

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        let custom = serde_json::json!({
            "outputs_enabled": self.outputs_enabled(),
            "latched": self.latched_roles().to_string(),
            "visible": self.visible_roles().to_string(),
        });
        Some(DriverDiagnostics {
            latch_pulses: self.latch_pulses,
            line_writes: self
                .writes
                .iter()
                .map(|w| match w {
                    LineWrite::Selector { .. } => 2,
                    _ => 1,
                })
                .sum(),
            custom: Some(custom.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized() -> SimulatedMatrix {
        let mut sim = SimulatedMatrix::new();
        sim.init(&MatrixConfig::default()).unwrap();
        sim
    }

    #[test]
    fn writes_before_init_fail() {
        let mut sim = SimulatedMatrix::new();
        assert!(matches!(
            sim.set_output_enable(true),
            Err(HalError::NotInitialized)
        ));
    }

    #[test]
    fn latch_captures_on_falling_edge() {
        let mut sim = initialized();
        sim.set_selector_pair(0, ChannelRole::Cathode.selector_bits())
            .unwrap();
        sim.set_latch_enable(1, true).unwrap();
        sim.set_latch_enable(1, false).unwrap();

        // Only position 0 of group 1 was set; other positions read floating.
        assert_eq!(sim.latched_roles().get(5), Ok(ChannelRole::Cathode));
        assert_eq!(sim.latched_roles().get(1), Ok(ChannelRole::Floating));

        // Closed latch ignores later selector changes.
        sim.set_selector_pair(0, ChannelRole::Ground.selector_bits())
            .unwrap();
        assert_eq!(sim.latched_roles().get(5), Ok(ChannelRole::Cathode));
        assert_eq!(sim.diagnostics().unwrap().latch_pulses, 1);
    }

    #[test]
    fn transparent_while_latch_open() {
        let mut sim = initialized();
        sim.set_latch_enable(0, true).unwrap();
        sim.set_selector_pair(3, ChannelRole::Anode.selector_bits())
            .unwrap();
        assert_eq!(sim.latched_roles().get(4), Ok(ChannelRole::Anode));
    }

    #[test]
    fn bus_floating_until_output_enabled() {
        let mut sim = initialized();
        sim.set_selector_pair(0, ChannelRole::Ground.selector_bits())
            .unwrap();
        sim.set_latch_enable(0, true).unwrap();
        sim.set_latch_enable(0, false).unwrap();
        assert_eq!(sim.visible_roles(), ChannelState::new());

        // Default wiring is active-low.
        sim.set_output_enable(false).unwrap();
        assert!(sim.outputs_enabled());
        assert_eq!(sim.visible_roles().get(1), Ok(ChannelRole::Ground));
    }

    #[test]
    fn diagnostics_report_json() {
        let sim = initialized();
        let diag = sim.diagnostics().unwrap();
        let custom: serde_json::Value = serde_json::from_str(&diag.custom.unwrap()).unwrap();
        assert_eq!(custom["outputs_enabled"], false);
        assert_eq!(custom["visible"], "FFFFFFFFFFFFFFFF");
    }
}
