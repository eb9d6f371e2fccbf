//! # estim Stimulation Library
//!
//! Runs stimulation configurations against a stimulator transport.
//!
//! # Module Structure
//!
//! - [`session`] - `StimulationSession`: validate, generate, encode, upload, wait
//! - [`simulator`] - `SimulatedStimulator` transport
//! - [`config`] - `stim.toml` layout and `DeviceConfig`

pub mod config;
pub mod session;
pub mod simulator;

pub use crate::config::{DeviceConfig, StimFileConfig};
pub use crate::session::{SessionError, SessionOutcome, StimulationSession};
pub use crate::simulator::SimulatedStimulator;
