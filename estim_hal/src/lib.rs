//! # estim HAL Library
//!
//! Switch-matrix driver with pluggable digital-output backends.
//!
//! Backends implement the `SwitchMatrixBackend` trait defined in
//! `estim_common::hal::driver`; `MatrixCore` owns the channel state and the
//! commit protocol.
//!
//! # Module Structure
//!
//! - [`core`] - `MatrixCore`, commit protocol
//! - [`timing`] - Precise delay for the latch hold time
//! - [`driver_registry`] - Backend factory registration
//! - [`drivers`] - Backend implementations
//! - [`persistence`] - Last committed state across runs
//! - [`config`] - `matrix.toml` layout
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     estim_hal                                │
//! │  ┌──────────────┐    ┌──────────────┐    ┌────────────────┐  │
//! │  │ CLI / caller │───►│  MatrixCore  │◄───│ DriverRegistry │  │
//! │  └──────────────┘    │  (Mutex)     │    └────────────────┘  │
//! │                      └──────┬───────┘                        │
//! │                             │  OE / selector / LE writes     │
//! │                             ▼                                │
//! │                   ┌─────────────────────┐                    │
//! │                   │ SwitchMatrixBackend │ (trait object)     │
//! │                   └─────────────────────┘                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod persistence;
pub mod timing;

// Re-export key types for convenience
pub use crate::core::MatrixCore;
pub use crate::driver_registry::DriverRegistry;
pub use crate::timing::{PreciseDelay, SleepDelay, SpinDelay};
