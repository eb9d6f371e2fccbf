//! Stimulation waveform types and the pulse-train sequencer.
//!
//! # Module Structure
//!
//! - [`config`] - `StimulationConfig` (per-waveform tagged union) and its
//!   normalized form `PulsePlan`
//! - [`sequence`] - Pulse-train generator producing stimulation + sync sequences
//! - [`encoding`] - Sign-magnitude amplitude packing for the device transport
//! - [`dat`] - MC_Stimulus II ASCII `.dat` export
//! - [`transport`] - Device-transport trait consumed by the session runner
//! - [`error`] - Configuration / encoding error type

pub mod config;
pub mod dat;
pub mod encoding;
pub mod error;
pub mod sequence;
pub mod transport;

pub use config::{Modulation, PulsePlan, StimulationConfig, Waveform, WaveformShape};
pub use error::StimError;
pub use sequence::{PulseEvent, PulseProgram, TrainBlock};
