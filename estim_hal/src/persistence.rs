//! Matrix state persistence.
//!
//! A one-shot `estim_hal` invocation starts a fresh `MatrixCore`, which
//! would otherwise commit all-floating every time. When a state file is
//! configured, the last committed state is saved after each command and
//! restored on the next start. State is persisted using bincode.

use estim_common::channel::ChannelState;
use estim_common::hal::driver::HalError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persisted matrix state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedMatrixState {
    /// Version of state format (for migration)
    pub version: u32,
    /// Last committed roles
    pub roles: ChannelState,
    /// Timestamp of last save (Unix epoch seconds)
    pub saved_at: u64,
}

impl PersistedMatrixState {
    /// Current state format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Current-version state for `roles`.
    pub fn new(roles: ChannelState) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            roles,
            saved_at: 0,
        }
    }
}

/// State persistence manager.
pub struct StatePersistence {
    path: PathBuf,
}

impl StatePersistence {
    /// Create a new persistence manager.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Save `roles` to the state file.
    pub fn save(&self, roles: ChannelState) -> Result<(), HalError> {
        debug!("Saving matrix state to {:?}", self.path);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                HalError::PersistenceError(format!("Failed to create directory: {e}"))
            })?;
        }

        let mut state = PersistedMatrixState::new(roles);
        state.saved_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let file = File::create(&self.path).map_err(|e| {
            HalError::PersistenceError(format!("Failed to create state file: {e}"))
        })?;
        bincode::serialize_into(BufWriter::new(file), &state).map_err(|e| {
            HalError::PersistenceError(format!("Failed to serialize state: {e}"))
        })?;

        info!("Saved matrix state {} to {:?}", roles, self.path);
        Ok(())
    }

    /// Load the saved roles, `None` if there is no usable state file.
    pub fn load(&self) -> Result<Option<ChannelState>, HalError> {
        if !self.path.exists() {
            debug!("State file {:?} does not exist, starting fresh", self.path);
            return Ok(None);
        }

        let file = File::open(&self.path).map_err(|e| {
            HalError::PersistenceError(format!("Failed to open state file: {e}"))
        })?;
        let state: PersistedMatrixState =
            bincode::deserialize_from(BufReader::new(file)).map_err(|e| {
                HalError::PersistenceError(format!("Failed to deserialize state: {e}"))
            })?;

        if state.version != PersistedMatrixState::CURRENT_VERSION {
            warn!(
                "State file version {} differs from current {}, starting fresh",
                state.version,
                PersistedMatrixState::CURRENT_VERSION
            );
            return Ok(None);
        }

        info!(
            "Loaded matrix state {} from {:?} (saved at {})",
            state.roles, self.path, state.saved_at
        );
        Ok(Some(state.roles))
    }

    /// Delete the state file.
    pub fn delete(&self) -> Result<(), HalError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                HalError::PersistenceError(format!("Failed to delete state file: {e}"))
            })?;
            info!("Deleted state file {:?}", self.path);
        }
        Ok(())
    }
}
