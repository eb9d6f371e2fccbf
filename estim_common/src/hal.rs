//! Switch-matrix hardware abstraction types.
//!
//! This module contains the backend trait implemented by digital-output
//! drivers and the wiring configuration of the 4×4 switch matrix.

pub mod config;
pub mod driver;
