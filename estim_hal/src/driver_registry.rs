//! Driver registry for switch-matrix backends.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving backend
//! factories. This uses constructor-injection rather than global state.

use estim_common::hal::driver::{BackendFactory, HalError, SwitchMatrixBackend};
use std::collections::HashMap;

/// Registry of available switch-matrix backends.
///
/// Constructed at startup, populated via `register()`, and consulted once
/// to create the backend handed to `MatrixCore`.
pub struct DriverRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory.
    ///
    /// # Errors
    /// Returns `HalError::ConfigError` if a backend with the same name is
    /// already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) -> Result<(), HalError> {
        if self.factories.contains_key(name) {
            return Err(HalError::ConfigError(format!(
                "Driver '{name}' is already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BackendFactory> {
        self.factories.get(name).copied()
    }

    /// Create a backend instance by name.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no backend with the given name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn SwitchMatrixBackend>, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered backend names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
