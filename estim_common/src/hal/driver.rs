//! Switch-matrix backend trait and error types.
//!
//! This module defines:
//! - `SwitchMatrixBackend` trait - Interface for pluggable digital-output backends
//! - `HalError` enum - Error types for matrix operations
//! - `BackendFactory` type alias - Factory function type
//! - `DriverDiagnostics` struct - Optional backend diagnostics

use crate::channel::{ChannelError, SelectorBits};
use crate::hal::config::MatrixConfig;
use thiserror::Error;

/// Error types for switch-matrix operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Backend initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Digital-output write failed
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// Backend not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Backend used before `init()` or after `shutdown()`
    #[error("Driver not initialized")]
    NotInitialized,

    /// Matrix state could not be saved or restored
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// Invalid channel addressing or signal string
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Factory function type for creating backend instances.
pub type BackendFactory = fn() -> Box<dyn SwitchMatrixBackend>;

/// Optional backend diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DriverDiagnostics {
    /// Number of completed latch pulses
    pub latch_pulses: u64,
    /// Number of digital-output writes
    pub line_writes: u64,
    /// Backend-specific diagnostics (JSON string)
    pub custom: Option<String>,
}

/// Trait defining the interface for switch-matrix backends.
///
/// The matrix driver owns the commit protocol (ordering, latch hold time,
/// output-enable polarity); a backend only drives physical line levels.
///
/// # Lifecycle
///
/// 1. `init()` - Called once with the wiring configuration
/// 2. `set_*()` - Called in strict program order by the matrix driver
/// 3. `shutdown()` - Called when the driver is stopping
pub trait SwitchMatrixBackend: Send {
    /// Returns the backend's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the backend's semantic version.
    fn version(&self) -> &'static str;

    /// Claim the output lines described by `config`.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if the lines cannot be claimed.
    fn init(&mut self, config: &MatrixConfig) -> Result<(), HalError>;

    /// Drive the master output-enable line to a raw logic level.
    fn set_output_enable(&mut self, level: bool) -> Result<(), HalError>;

    /// Drive the selector pair of intra-group `position` (0..4).
    fn set_selector_pair(&mut self, position: usize, bits: SelectorBits) -> Result<(), HalError>;

    /// Drive the latch-enable line of `group` (0..4) to a raw logic level.
    fn set_latch_enable(&mut self, group: usize, level: bool) -> Result<(), HalError>;

    /// Release the output lines.
    fn shutdown(&mut self) -> Result<(), HalError>;

    /// Get backend-specific diagnostics.
    /// Default: None
    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        None
    }
}
