//! Unit normalization for durations and amplitudes.
//!
//! Every duration / amplitude in a stimulation configuration carries a unit
//! tag. Before sequence generation all durations are converted to integer
//! microseconds and all amplitudes to integer µ-units (µA or µV, depending
//! on the modulation) through fixed multiplicative factors.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a quantity cannot be normalized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    /// Value is NaN or infinite.
    #[error("{what} is not a finite number ({value})")]
    NotFinite { what: &'static str, value: f64 },

    /// Durations cannot be negative.
    #[error("{what} cannot be negative ({value})")]
    Negative { what: &'static str, value: f64 },

    /// Normalized value does not fit the target integer type.
    #[error("{what} is out of range ({value})")]
    OutOfRange { what: &'static str, value: f64 },

    /// Frequency must be strictly positive.
    #[error("frequency must be greater than 0 Hz (got {0})")]
    InvalidFrequency(f64),

    /// Unknown unit spelling.
    #[error("unknown unit: {0:?}")]
    UnknownUnit(String),
}

// ─── TimeUnit ───────────────────────────────────────────────────────

/// Time unit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Microseconds.
    #[default]
    #[serde(rename = "us", alias = "µs")]
    Micros,
    /// Milliseconds.
    #[serde(rename = "ms")]
    Millis,
    /// Seconds.
    #[serde(rename = "s")]
    Seconds,
}

impl TimeUnit {
    /// Multiplicative factor to microseconds.
    pub const fn factor(self) -> u64 {
        match self {
            Self::Micros => 1,
            Self::Millis => 1_000,
            Self::Seconds => 1_000_000,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Micros => write!(f, "us"),
            Self::Millis => write!(f, "ms"),
            Self::Seconds => write!(f, "s"),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = UnitError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "us" | "µs" => Ok(Self::Micros),
            "ms" => Ok(Self::Millis),
            "s" => Ok(Self::Seconds),
            _ => Err(UnitError::UnknownUnit(s.to_string())),
        }
    }
}

// ─── AmplitudeUnit ──────────────────────────────────────────────────

/// Amplitude magnitude prefix. The base quantity (ampere or volt) follows
/// from the modulation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AmplitudeUnit {
    /// µA / µV.
    #[default]
    #[serde(rename = "u", alias = "uA", alias = "uV", alias = "µA", alias = "µV")]
    Micro,
    /// mA / mV.
    #[serde(rename = "m", alias = "mA", alias = "mV")]
    Milli,
    /// A / V.
    #[serde(rename = "base", alias = "A", alias = "V")]
    Base,
}

impl AmplitudeUnit {
    /// Multiplicative factor to µ-units.
    pub const fn factor(self) -> u64 {
        match self {
            Self::Micro => 1,
            Self::Milli => 1_000,
            Self::Base => 1_000_000,
        }
    }
}

impl FromStr for AmplitudeUnit {
    type Err = UnitError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "u" | "uA" | "uV" | "µA" | "µV" => Ok(Self::Micro),
            "m" | "mA" | "mV" => Ok(Self::Milli),
            "base" | "A" | "V" => Ok(Self::Base),
            _ => Err(UnitError::UnknownUnit(s.to_string())),
        }
    }
}

// ─── Quantities ─────────────────────────────────────────────────────

/// A duration with its unit, as written in a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeQuantity {
    /// Raw value.
    pub value: f64,
    /// Unit tag.
    #[serde(default)]
    pub unit: TimeUnit,
}

impl TimeQuantity {
    /// Construct a quantity.
    pub const fn new(value: f64, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    /// Quantity in microseconds.
    pub const fn micros(value: u64) -> Self {
        Self {
            value: value as f64,
            unit: TimeUnit::Micros,
        }
    }

    /// Normalize to integer microseconds (rounded to nearest).
    pub fn to_micros(&self, what: &'static str) -> Result<u64, UnitError> {
        time_to_micros(self.value, self.unit, what)
    }
}

/// A signed amplitude with its magnitude prefix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AmplitudeQuantity {
    /// Raw signed value.
    pub value: f64,
    /// Magnitude prefix.
    #[serde(default)]
    pub unit: AmplitudeUnit,
}

impl AmplitudeQuantity {
    /// Construct a quantity.
    pub const fn new(value: f64, unit: AmplitudeUnit) -> Self {
        Self { value, unit }
    }

    /// Normalize to integer µ-units (rounded to nearest).
    pub fn to_micro_units(&self) -> Result<i64, UnitError> {
        amplitude_to_micro_units(self.value, self.unit)
    }
}

// ─── Conversions ────────────────────────────────────────────────────

/// Convert a duration to integer microseconds.
pub fn time_to_micros(value: f64, unit: TimeUnit, what: &'static str) -> Result<u64, UnitError> {
    if !value.is_finite() {
        return Err(UnitError::NotFinite { what, value });
    }
    if value < 0.0 {
        return Err(UnitError::Negative { what, value });
    }
    let us = (value * unit.factor() as f64).round();
    if us > u64::MAX as f64 {
        return Err(UnitError::OutOfRange { what, value });
    }
    Ok(us as u64)
}

/// Convert integer microseconds back to a value in `unit`.
pub fn micros_to_time(us: u64, unit: TimeUnit) -> f64 {
    us as f64 / unit.factor() as f64
}

/// Convert a signed amplitude to integer µ-units.
pub fn amplitude_to_micro_units(value: f64, unit: AmplitudeUnit) -> Result<i64, UnitError> {
    if !value.is_finite() {
        return Err(UnitError::NotFinite {
            what: "amplitude",
            value,
        });
    }
    let micro = (value * unit.factor() as f64).round();
    if micro.abs() > i64::MAX as f64 {
        return Err(UnitError::OutOfRange {
            what: "amplitude",
            value,
        });
    }
    Ok(micro as i64)
}

/// Convert integer µ-units back to a value in `unit`.
pub fn micro_units_to_amplitude(micro: i64, unit: AmplitudeUnit) -> f64 {
    micro as f64 / unit.factor() as f64
}

/// Period in microseconds for a frequency in hertz.
///
/// Zero, negative or non-finite frequencies are rejected instead of
/// producing an infinite period.
pub fn frequency_to_period_us(hz: f64) -> Result<u64, UnitError> {
    if !hz.is_finite() || hz <= 0.0 {
        return Err(UnitError::InvalidFrequency(hz));
    }
    time_to_micros(1.0 / hz, TimeUnit::Seconds, "period")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_factors() {
        assert_eq!(time_to_micros(5.0, TimeUnit::Micros, "t").unwrap(), 5);
        assert_eq!(time_to_micros(5.0, TimeUnit::Millis, "t").unwrap(), 5_000);
        assert_eq!(time_to_micros(2.0, TimeUnit::Seconds, "t").unwrap(), 2_000_000);
        assert_eq!(time_to_micros(0.5, TimeUnit::Millis, "t").unwrap(), 500);
    }

    #[test]
    fn integer_round_trip_is_exact() {
        for unit in [TimeUnit::Micros, TimeUnit::Millis, TimeUnit::Seconds] {
            for value in [0u32, 1, 7, 250, 1_000, 86_400] {
                let us = time_to_micros(value as f64, unit, "t").unwrap();
                assert_eq!(micros_to_time(us, unit), value as f64, "{value} {unit}");
            }
        }
        for unit in [AmplitudeUnit::Micro, AmplitudeUnit::Milli, AmplitudeUnit::Base] {
            for value in [-42i32, 0, 1, 4095] {
                let micro = amplitude_to_micro_units(value as f64, unit).unwrap();
                assert_eq!(micro_units_to_amplitude(micro, unit), value as f64);
            }
        }
    }

    #[test]
    fn negative_duration_rejected() {
        let err = time_to_micros(-1.0, TimeUnit::Millis, "pulse_duration").unwrap_err();
        assert!(matches!(err, UnitError::Negative { what: "pulse_duration", .. }));
    }

    #[test]
    fn non_finite_rejected() {
        assert!(time_to_micros(f64::NAN, TimeUnit::Micros, "t").is_err());
        assert!(amplitude_to_micro_units(f64::INFINITY, AmplitudeUnit::Micro).is_err());
    }

    #[test]
    fn amplitude_keeps_sign() {
        assert_eq!(
            amplitude_to_micro_units(-1.5, AmplitudeUnit::Milli).unwrap(),
            -1_500
        );
    }

    #[test]
    fn frequency_to_period() {
        assert_eq!(frequency_to_period_us(1_000.0).unwrap(), 1_000);
        assert_eq!(frequency_to_period_us(50.0).unwrap(), 20_000);
        assert_eq!(
            frequency_to_period_us(0.0),
            Err(UnitError::InvalidFrequency(0.0))
        );
        assert!(frequency_to_period_us(-10.0).is_err());
        assert!(frequency_to_period_us(f64::NAN).is_err());
    }

    #[test]
    fn unit_spellings() {
        assert_eq!("ms".parse::<TimeUnit>().unwrap(), TimeUnit::Millis);
        assert_eq!("mA".parse::<AmplitudeUnit>().unwrap(), AmplitudeUnit::Milli);
        assert_eq!("V".parse::<AmplitudeUnit>().unwrap(), AmplitudeUnit::Base);
        assert!("hours".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn quantity_deserialization() {
        #[derive(Deserialize)]
        struct Wrapper {
            t: TimeQuantity,
            a: AmplitudeQuantity,
        }
        let w: Wrapper = toml::from_str(
            r#"
t = { value = 2, unit = "ms" }
a = { value = -0.5, unit = "mA" }
"#,
        )
        .unwrap();
        assert_eq!(w.t.to_micros("t").unwrap(), 2_000);
        assert_eq!(w.a.to_micro_units().unwrap(), -500);
    }
}
