//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use estim_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use estim_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── Matrix Topology ────────────────────────────────────────────────
pub use crate::consts::{CHANNEL_COUNT, CHANNELS_PER_GROUP, GROUP_COUNT};

// ─── Channels ───────────────────────────────────────────────────────
pub use crate::channel::{ChannelError, ChannelRole, ChannelRoles, ChannelState, SelectorBits};

// ─── Switch Matrix ──────────────────────────────────────────────────
pub use crate::hal::config::MatrixConfig;
pub use crate::hal::driver::{HalError, SwitchMatrixBackend};

// ─── Stimulation ────────────────────────────────────────────────────
pub use crate::stim::encoding::{AmplitudeEncoder, DeviceFrame, EncodedProgram, SignMagnitude};
pub use crate::stim::transport::{StimulatorTransport, TransportError};
pub use crate::stim::{
    Modulation, PulseEvent, PulsePlan, PulseProgram, StimError, StimulationConfig, TrainBlock,
    Waveform, WaveformShape,
};
pub use crate::units::{AmplitudeQuantity, AmplitudeUnit, TimeQuantity, TimeUnit};
