//! Switch-matrix driver.
//!
//! `MatrixCore` owns the desired 16-channel state and the backend, and runs
//! the commit protocol that moves the state into the hardware latches.
//!
//! # Commit Protocol
//!
//! ```text
//! OE ← inactive
//! for group in 0..4:
//!     for position in 0..4:
//!         selector[position] ← code(channel 4·group + position)
//!     LE[group] ← high, hold latch_hold_us, LE[group] ← low
//! OE ← active
//! ```
//!
//! Every operation holds the same lock for its full duration, so only one
//! commit is ever in flight and the state it writes cannot change under it.
//! A backend error aborts the commit and leaves OE inactive.

use crate::timing::PreciseDelay;
use estim_common::channel::{ChannelRole, ChannelRoles, ChannelState};
use estim_common::consts::GROUP_COUNT;
use estim_common::hal::config::MatrixConfig;
use estim_common::hal::driver::{DriverDiagnostics, HalError, SwitchMatrixBackend};
use parking_lot::Mutex;
use tracing::{debug, error, info};

struct MatrixInner {
    state: ChannelState,
    backend: Box<dyn SwitchMatrixBackend>,
    delay: Box<dyn PreciseDelay>,
    outputs_enabled: bool,
    commits: u64,
    shut_down: bool,
}

/// Switch-matrix driver service.
pub struct MatrixCore {
    config: MatrixConfig,
    inner: Mutex<MatrixInner>,
}

impl MatrixCore {
    /// Validate the wiring, initialize the backend and commit all-floating.
    ///
    /// # Errors
    /// Configuration, backend init or the initial commit failed.
    pub fn new(
        config: MatrixConfig,
        mut backend: Box<dyn SwitchMatrixBackend>,
        delay: Box<dyn PreciseDelay>,
    ) -> Result<Self, HalError> {
        config.validate()?;
        backend.init(&config)?;
        info!(
            "MatrixCore created with backend {} v{}, latch_hold={}us, OE active {}",
            backend.name(),
            backend.version(),
            config.latch_hold_us,
            if config.output_enable_active_high { "high" } else { "low" }
        );

        let core = Self {
            config,
            inner: Mutex::new(MatrixInner {
                state: ChannelState::new(),
                backend,
                delay,
                outputs_enabled: false,
                commits: 0,
                shut_down: false,
            }),
        };
        core.latch()?;
        Ok(core)
    }

    /// Wiring configuration.
    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    /// Set one channel (1-based) and commit.
    pub fn set_channel(&self, channel: i64, role: ChannelRole) -> Result<ChannelState, HalError> {
        let mut inner = self.inner.lock();
        inner.state.set(channel, role)?;
        info!("Channel {channel} set to {role}");
        self.commit(&mut inner)?;
        Ok(inner.state)
    }

    /// Set all 16 channels from an A/C/G/F string and commit.
    ///
    /// The string is validated as a whole; nothing changes if any letter is
    /// invalid.
    pub fn set_all(&self, signals: &str) -> Result<ChannelState, HalError> {
        let state = ChannelState::parse_signals(signals)?;
        self.set_state(state)
    }

    /// Replace the whole state and commit.
    pub fn set_state(&self, state: ChannelState) -> Result<ChannelState, HalError> {
        let mut inner = self.inner.lock();
        inner.state = state;
        info!("All channels set to {state}");
        self.commit(&mut inner)?;
        Ok(inner.state)
    }

    /// Apply a sparse channel → role map and commit.
    pub fn apply_roles(&self, roles: &ChannelRoles) -> Result<ChannelState, HalError> {
        let mut inner = self.inner.lock();
        inner.state.apply(roles);
        info!(assigned = roles.len(), "Applied channel roles: {}", inner.state);
        self.commit(&mut inner)?;
        Ok(inner.state)
    }

    /// Snapshot of the desired state.
    pub fn status(&self) -> ChannelState {
        self.inner.lock().state
    }

    /// True when the last commit completed and OE is active.
    pub fn outputs_enabled(&self) -> bool {
        self.inner.lock().outputs_enabled
    }

    /// Number of completed commits.
    pub fn commit_count(&self) -> u64 {
        self.inner.lock().commits
    }

    /// Backend diagnostics.
    pub fn diagnostics(&self) -> Option<DriverDiagnostics> {
        self.inner.lock().backend.diagnostics()
    }

    /// Re-commit the current state.
    pub fn latch(&self) -> Result<(), HalError> {
        let mut inner = self.inner.lock();
        self.commit(&mut inner)
    }

    /// Drive OE inactive and release the backend. Later operations fail
    /// with `NotInitialized`.
    pub fn shutdown(&self) -> Result<(), HalError> {
        let mut inner = self.inner.lock();
        if inner.shut_down {
            return Ok(());
        }
        inner.outputs_enabled = false;
        inner.shut_down = true;
        let inactive = self.config.output_enable_inactive_level();
        let disable = inner.backend.set_output_enable(inactive);
        let release = inner.backend.shutdown();
        info!(commits = inner.commits, "MatrixCore shut down");
        disable.and(release)
    }

    fn commit(&self, inner: &mut MatrixInner) -> Result<(), HalError> {
        if inner.shut_down {
            return Err(HalError::NotInitialized);
        }
        let snapshot = inner.state;
        inner.outputs_enabled = false;
        if let Err(e) = Self::run_protocol(&self.config, inner, &snapshot) {
            error!("Latch of {snapshot} aborted with OE inactive: {e}");
            return Err(e);
        }
        inner.outputs_enabled = true;
        inner.commits += 1;
        debug!(commit = inner.commits, "Latched {snapshot}");
        Ok(())
    }

    fn run_protocol(
        config: &MatrixConfig,
        inner: &mut MatrixInner,
        snapshot: &ChannelState,
    ) -> Result<(), HalError> {
        let backend = &mut inner.backend;
        backend.set_output_enable(config.output_enable_inactive_level())?;

        for group in 0..GROUP_COUNT {
            let roles = snapshot.group(group);
            for (position, role) in roles.iter().enumerate() {
                backend.set_selector_pair(position, role.selector_bits())?;
            }
            backend.set_latch_enable(group, true)?;
            inner.delay.delay_us(config.latch_hold_us);
            backend.set_latch_enable(group, false)?;
            debug!(group, "Group latched: {}{}{}{}", roles[0], roles[1], roles[2], roles[3]);
        }

        backend.set_output_enable(config.output_enable_active_level())
    }
}

impl Drop for MatrixCore {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("MatrixCore shutdown failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulatedMatrix;
    use crate::timing::SpinDelay;

    fn core() -> MatrixCore {
        let config = MatrixConfig {
            latch_hold_us: 1,
            ..Default::default()
        };
        MatrixCore::new(config, Box::new(SimulatedMatrix::new()), Box::new(SpinDelay)).unwrap()
    }

    fn visible(core: &MatrixCore) -> String {
        let custom = core.diagnostics().unwrap().custom.unwrap();
        let value: serde_json::Value = serde_json::from_str(&custom).unwrap();
        value["visible"].as_str().unwrap().to_string()
    }

    #[test]
    fn starts_floating_and_enabled() {
        let core = core();
        assert_eq!(core.status(), ChannelState::new());
        assert!(core.outputs_enabled());
        assert_eq!(core.commit_count(), 1);
        assert_eq!(core.diagnostics().unwrap().latch_pulses, 4);
    }

    #[test]
    fn set_channel_commits() {
        let core = core();
        let state = core.set_channel(3, ChannelRole::Anode).unwrap();
        assert_eq!(state.to_string(), "FFAFFFFFFFFFFFFF");
        assert_eq!(visible(&core), "FFAFFFFFFFFFFFFF");
    }

    #[test]
    fn invalid_channel_leaves_state() {
        let core = core();
        core.set_channel(1, ChannelRole::Cathode).unwrap();
        assert!(matches!(
            core.set_channel(17, ChannelRole::Ground),
            Err(HalError::Channel(_))
        ));
        assert_eq!(core.status().to_string(), "CFFFFFFFFFFFFFFF");
        assert_eq!(core.commit_count(), 2);
    }

    #[test]
    fn set_all_is_all_or_nothing() {
        let core = core();
        core.set_all("CAGGCAGGCAGGCAGG").unwrap();
        assert!(core.set_all("CAGGCAGGCAGGCAGX").is_err());
        assert_eq!(core.status().to_string(), "CAGGCAGGCAGGCAGG");
        assert_eq!(visible(&core), "CAGGCAGGCAGGCAGG");
    }

    #[test]
    fn apply_roles_merges() {
        let core = core();
        core.set_all("GGGGGGGGGGGGGGGG").unwrap();
        let mut roles = ChannelRoles::new();
        roles.insert(1, ChannelRole::Cathode).unwrap();
        roles.insert(2, ChannelRole::Anode).unwrap();
        let state = core.apply_roles(&roles).unwrap();
        assert_eq!(state.to_string(), "CAGGGGGGGGGGGGGG");
    }

    #[test]
    fn operations_fail_after_shutdown() {
        let core = core();
        core.shutdown().unwrap();
        assert!(!core.outputs_enabled());
        assert!(matches!(core.latch(), Err(HalError::NotInitialized)));
        // Idempotent
        core.shutdown().unwrap();
    }

    #[test]
    fn invalid_wiring_rejected() {
        let config = MatrixConfig {
            latch_hold_us: 0,
            ..Default::default()
        };
        let result = MatrixCore::new(config, Box::new(SimulatedMatrix::new()), Box::new(SpinDelay));
        assert!(matches!(result, Err(HalError::ConfigError(_))));
    }
}
