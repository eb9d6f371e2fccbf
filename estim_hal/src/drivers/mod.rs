//! Switch-matrix backend implementations.
//!
//! This module contains all built-in backends:
//!
//! - [`simulation`] - Software switch matrix for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `SwitchMatrixBackend` trait from `estim_common::hal::driver`
//! 3. Register the backend in `register_all_drivers()`

pub mod simulation;

use crate::driver_registry::DriverRegistry;
use estim_common::hal::driver::HalError;

/// Register all built-in backends.
pub fn register_all_drivers(registry: &mut DriverRegistry) -> Result<(), HalError> {
    registry.register("simulation", simulation::create_driver)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_drivers_registered() {
        let mut registry = DriverRegistry::new();
        register_all_drivers(&mut registry).unwrap();
        assert_eq!(registry.list_drivers(), vec!["simulation"]);
        let driver = registry.create_driver("simulation").unwrap();
        assert_eq!(driver.name(), "simulation");
    }
}
