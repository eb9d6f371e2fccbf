//! Stimulation configuration.
//!
//! `StimulationConfig` is what a caller writes (TOML / JSON, unit-tagged
//! values, one variant per waveform family). `normalize()` validates it and
//! produces a `PulsePlan`: integer microseconds and µ-units, ready for the
//! sequencer.
//!
//! # TOML Example
//!
//! ```toml
//! [stimulation]
//! modulation = "current"
//! amplitude = { value = 100, unit = "uA" }
//! event_count = 3
//! inter_event_gap = { value = 100, unit = "us" }
//! train_count = 2
//! train_duration = { value = 2, unit = "ms" }
//! external_trigger_duration = { value = 500, unit = "us" }
//!
//! [stimulation.waveform]
//! kind = "biphasic"
//! pulse_duration = { value = 100, unit = "us" }
//!
//! [stimulation.channel_roles]
//! "1" = "C"
//! "2" = "A"
//! ```

use crate::channel::ChannelRoles;
use crate::consts::MAX_AMPLITUDE_MAGNITUDE;
use crate::stim::error::StimError;
use crate::units::{AmplitudeQuantity, TimeQuantity, TimeUnit, frequency_to_period_us};
use core::fmt;
use serde::{Deserialize, Serialize};

// ─── Modulation ─────────────────────────────────────────────────────

/// Output regulation of the stimulator channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modulation {
    /// Current-controlled output (amplitudes in µA).
    #[default]
    #[serde(alias = "Current")]
    Current,
    /// Voltage-controlled output (amplitudes in µV).
    #[serde(alias = "Voltage")]
    Voltage,
}

impl fmt::Display for Modulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Voltage => write!(f, "voltage"),
        }
    }
}

// ─── Waveform ───────────────────────────────────────────────────────

/// Period of a sinusoidal event, given directly or as a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PeriodOrFrequency {
    /// Period with unit.
    Period {
        /// Raw value.
        value: f64,
        /// Unit tag.
        #[serde(default)]
        unit: TimeUnit,
    },
    /// Frequency in hertz.
    Frequency {
        /// Frequency [Hz].
        hz: f64,
    },
}

impl PeriodOrFrequency {
    /// Period in microseconds.
    pub fn period_us(&self) -> Result<u64, StimError> {
        let us = match *self {
            Self::Period { value, unit } => TimeQuantity::new(value, unit).to_micros("period")?,
            Self::Frequency { hz } => frequency_to_period_us(hz)?,
        };
        Ok(us)
    }
}

/// Waveform family with the fields relevant to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Waveform {
    /// One pulse per event.
    Monophasic {
        /// Pulse width.
        pulse_duration: TimeQuantity,
    },
    /// Positive phase immediately followed by the negative phase.
    Biphasic {
        /// Width of each phase.
        pulse_duration: TimeQuantity,
    },
    /// One period-long pulse per event.
    Sinusoidal {
        /// Period or frequency.
        timing: PeriodOrFrequency,
    },
}

impl Waveform {
    /// Shape tag without parameters.
    pub const fn shape(&self) -> WaveformShape {
        match self {
            Self::Monophasic { .. } => WaveformShape::Monophasic,
            Self::Biphasic { .. } => WaveformShape::Biphasic,
            Self::Sinusoidal { .. } => WaveformShape::Sinusoidal,
        }
    }
}

/// Waveform family of a normalized plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveformShape {
    /// One phase per event.
    Monophasic,
    /// Two phases per event.
    Biphasic,
    /// One period per event.
    Sinusoidal,
}

impl WaveformShape {
    /// Number of `pulse_us`-long phases per event.
    pub const fn phases(self) -> u64 {
        match self {
            Self::Biphasic => 2,
            Self::Monophasic | Self::Sinusoidal => 1,
        }
    }
}

impl fmt::Display for WaveformShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monophasic => write!(f, "monophasic"),
            Self::Biphasic => write!(f, "biphasic"),
            Self::Sinusoidal => write!(f, "sinusoidal"),
        }
    }
}

// ─── StimulationConfig ──────────────────────────────────────────────

/// Caller-supplied stimulation parameters, immutable per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulationConfig {
    /// Waveform family and its timing.
    pub waveform: Waveform,

    /// Current or voltage regulation.
    #[serde(default)]
    pub modulation: Modulation,

    /// Signed amplitude; the sign encodes the leading phase polarity.
    pub amplitude: AmplitudeQuantity,

    /// Events per train (≥ 1).
    pub event_count: u32,

    /// Gap between consecutive events; ignored when `event_count == 1`.
    #[serde(default)]
    pub inter_event_gap: TimeQuantity,

    /// Number of trains (≥ 1).
    pub train_count: u32,

    /// Total time of one train including its trailing rest.
    pub train_duration: TimeQuantity,

    /// High time of the sync output at the start of every train.
    #[serde(default)]
    pub external_trigger_duration: TimeQuantity,

    /// Switch-matrix roles applied before the run.
    #[serde(default)]
    pub channel_roles: ChannelRoles,
}

impl StimulationConfig {
    /// Validate and convert to integer microseconds / µ-units.
    ///
    /// # Errors
    ///
    /// Any `StimError`; nothing is clamped or silently skipped.
    pub fn normalize(&self) -> Result<PulsePlan, StimError> {
        if self.event_count == 0 {
            return Err(StimError::InvalidCount {
                what: "event_count",
            });
        }
        if self.train_count == 0 {
            return Err(StimError::InvalidCount {
                what: "train_count",
            });
        }

        let amplitude = self.amplitude.to_micro_units()?;
        if amplitude.unsigned_abs() > MAX_AMPLITUDE_MAGNITUDE as u64 {
            return Err(StimError::AmplitudeOutOfRange {
                amplitude,
                max: MAX_AMPLITUDE_MAGNITUDE,
            });
        }

        let (pulse_us, what) = match &self.waveform {
            Waveform::Monophasic { pulse_duration } | Waveform::Biphasic { pulse_duration } => {
                (pulse_duration.to_micros("pulse_duration")?, "pulse_duration")
            }
            Waveform::Sinusoidal { timing } => (timing.period_us()?, "period"),
        };
        if pulse_us == 0 {
            return Err(StimError::ZeroDuration { what });
        }

        let gap_us = if self.event_count > 1 {
            self.inter_event_gap.to_micros("inter_event_gap")?
        } else {
            0
        };

        let plan = PulsePlan {
            shape: self.waveform.shape(),
            modulation: self.modulation,
            amplitude: amplitude as i32,
            pulse_us,
            event_count: self.event_count,
            gap_us,
            train_count: self.train_count,
            train_budget_us: self.train_duration.to_micros("train_duration")?,
            trigger_us: self
                .external_trigger_duration
                .to_micros("external_trigger_duration")?,
        };
        plan.validate()?;
        Ok(plan)
    }
}

// ─── PulsePlan ──────────────────────────────────────────────────────

/// Normalized stimulation parameters (µs, µ-units).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulsePlan {
    /// Waveform family.
    pub shape: WaveformShape,
    /// Current or voltage regulation.
    pub modulation: Modulation,
    /// Signed amplitude [µA or µV].
    pub amplitude: i32,
    /// Phase width (pulse duration, or the period for sinusoids) [µs].
    pub pulse_us: u64,
    /// Events per train.
    pub event_count: u32,
    /// Gap between events [µs].
    pub gap_us: u64,
    /// Number of trains.
    pub train_count: u32,
    /// Total time of one train including rest [µs].
    pub train_budget_us: u64,
    /// Sync high time per train [µs].
    pub trigger_us: u64,
}

impl PulsePlan {
    /// Duration of one event (all its phases) [µs].
    pub fn event_us(&self) -> u64 {
        self.pulse_us.saturating_mul(self.shape.phases())
    }

    /// Duration of one train's events and inter-event gaps, without rest [µs].
    pub fn active_train_us(&self) -> u64 {
        let events = u64::from(self.event_count);
        self.event_us()
            .saturating_mul(events)
            .saturating_add(self.gap_us.saturating_mul(events.saturating_sub(1)))
    }

    /// Rest appended between trains [µs].
    pub fn rest_us(&self) -> u64 {
        self.train_budget_us.saturating_sub(self.active_train_us())
    }

    /// Check the timing budget.
    ///
    /// # Errors
    ///
    /// - `InsufficientTrainBudget` if the events do not fit the train duration
    /// - `TriggerExceedsBudget` if the sync pulse does not fit the train duration
    pub fn validate(&self) -> Result<(), StimError> {
        let required_us = self.active_train_us();
        if required_us > self.train_budget_us {
            return Err(StimError::InsufficientTrainBudget {
                budget_us: self.train_budget_us,
                required_us,
            });
        }
        if self.trigger_us > self.train_budget_us {
            return Err(StimError::TriggerExceedsBudget {
                trigger_us: self.trigger_us,
                budget_us: self.train_budget_us,
            });
        }
        Ok(())
    }
}
