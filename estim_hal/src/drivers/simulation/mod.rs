//! Simulation driver module.
//!
//! This module provides a software switch matrix for development and testing
//! without physical hardware.

mod driver;

pub use driver::{LineWrite, SimulatedMatrix};

use estim_common::hal::driver::SwitchMatrixBackend;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn SwitchMatrixBackend> {
    Box::new(SimulatedMatrix::new())
}
