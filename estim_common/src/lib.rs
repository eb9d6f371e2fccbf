//! estim Common Library
//!
//! This crate provides the shared domain model, the waveform sequencer and
//! configuration loading utilities for all estim workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Matrix topology and encoding constants
//! - [`units`] - Time / amplitude unit normalization
//! - [`channel`] - Channel roles, 16-channel state, selector codes
//! - [`hal`] - Switch-matrix backend trait and wiring configuration
//! - [`stim`] - Stimulation config, sequencer, encoding, `.dat` export, transport trait
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use estim_common::prelude::*;
//! use estim_common::stim::sequence::generate;
//! ```

pub mod channel;
pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod stim;
pub mod units;
