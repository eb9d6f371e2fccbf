//! Stimulation session runner.
//!
//! # Run Sequence
//!
//! 1. normalize → generate → encode (no device I/O before this succeeds)
//! 2. apply channel roles on the switch matrix, if one is attached
//! 3. connect → set mode → clear / send channel and sync data → start
//! 4. wait train by train, checking the cancel flag between trains
//! 5. stop → disconnect
//!
//! Once connected, disconnect is attempted on every exit path. Nothing is
//! retried.

use crate::config::DeviceConfig;
use estim_common::hal::driver::HalError;
use estim_common::stim::encoding::{EncodedProgram, encode_program};
use estim_common::stim::sequence::{PulseProgram, generate};
use estim_common::stim::transport::{StimulatorTransport, TransportError};
use estim_common::stim::{StimError, StimulationConfig};
use estim_hal::{MatrixCore, PreciseDelay, SleepDelay};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that abort a stimulation session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Configuration rejected before any device I/O.
    #[error("Invalid stimulation configuration: {0}")]
    Config(#[from] StimError),

    /// Stimulator command failed.
    #[error("Stimulator transport failed: {0}")]
    Transport(#[from] TransportError),

    /// Switch-matrix programming failed.
    #[error("Switch matrix failed: {0}")]
    Matrix(#[from] HalError),
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every train was played.
    Completed { trains: u32 },
    /// The cancel flag was observed before train `trains_completed`.
    Cancelled { trains_completed: u32 },
}

/// Program and device frames prepared for upload.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub program: PulseProgram,
    pub encoded: EncodedProgram,
}

/// Runs stimulation configurations against a transport.
pub struct StimulationSession {
    device: DeviceConfig,
    waiter: Box<dyn PreciseDelay>,
    matrix: Option<Arc<MatrixCore>>,
}

impl StimulationSession {
    /// Session waiting with OS sleep and no switch matrix.
    pub fn new(device: DeviceConfig) -> Self {
        Self {
            device,
            waiter: Box::new(SleepDelay),
            matrix: None,
        }
    }

    /// Replace the between-train wait.
    pub fn with_delay(mut self, waiter: Box<dyn PreciseDelay>) -> Self {
        self.waiter = waiter;
        self
    }

    /// Apply `channel_roles` on `matrix` before each run.
    pub fn with_matrix(mut self, matrix: Arc<MatrixCore>) -> Self {
        self.matrix = Some(matrix);
        self
    }

    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    /// Validate, generate and encode without touching any device.
    pub fn prepare(&self, config: &StimulationConfig) -> Result<PreparedRun, StimError> {
        let plan = config.normalize()?;
        let program = generate(&plan)?;
        let encoder = self.device.encoder()?;
        let encoded = encode_program(&program, &encoder)?;
        debug!(
            stim_entries = encoded.stim.len(),
            sync_entries = encoded.sync.len(),
            sign_bit = encoder.sign_bit(),
            "Encoded program"
        );
        Ok(PreparedRun { program, encoded })
    }

    /// Play `config` on `transport`.
    pub fn run(
        &self,
        config: &StimulationConfig,
        transport: &mut dyn StimulatorTransport,
        cancel: &AtomicBool,
    ) -> Result<SessionOutcome, SessionError> {
        let prepared = self.prepare(config)?;
        let plan = prepared.program.plan;
        info!(
            shape = %plan.shape,
            modulation = %plan.modulation,
            amplitude = plan.amplitude,
            trains = plan.train_count,
            train_us = plan.train_budget_us,
            "Starting stimulation session on {}",
            transport.name()
        );

        if let Some(matrix) = &self.matrix {
            if !config.channel_roles.is_empty() {
                matrix.apply_roles(&config.channel_roles)?;
            }
        }

        if cancel.load(Ordering::SeqCst) {
            info!("Cancelled before connecting");
            return Ok(SessionOutcome::Cancelled {
                trains_completed: 0,
            });
        }

        transport.connect()?;
        let result = self.play(&prepared, transport, cancel);
        let disconnect = transport.disconnect();

        match (result, disconnect) {
            (Ok(outcome), Ok(())) => {
                info!(?outcome, "Stimulation session finished");
                Ok(outcome)
            }
            (Ok(_), Err(e)) => {
                error!("Disconnect failed: {e}");
                Err(e.into())
            }
            (Err(e), disconnect) => {
                if let Err(d) = disconnect {
                    warn!("Disconnect after failure also failed: {d}");
                }
                error!("Stimulation session aborted: {e}");
                Err(e)
            }
        }
    }

    fn play(
        &self,
        prepared: &PreparedRun,
        transport: &mut dyn StimulatorTransport,
        cancel: &AtomicBool,
    ) -> Result<SessionOutcome, SessionError> {
        let device = &self.device;
        let program = &prepared.program;

        transport.set_mode(program.plan.modulation)?;
        transport.clear_channel_data(device.stim_channel)?;
        transport.send_channel_data(device.stim_channel, &prepared.encoded.stim)?;
        transport.clear_sync_data(device.sync_out)?;
        transport.send_sync_data(device.sync_out, &prepared.encoded.sync)?;
        transport.start(device.trigger)?;

        let mut completed = 0u32;
        for (index, train) in program.trains.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                transport.stop(device.trigger)?;
                info!(trains_completed = completed, "Stimulation cancelled");
                return Ok(SessionOutcome::Cancelled {
                    trains_completed: completed,
                });
            }
            let wait_us = train.stim_duration_us().max(train.sync_duration_us());
            debug!(train = index, wait_us, "Waiting for train");
            self.waiter.delay_us(wait_us);
            completed += 1;
        }

        transport.stop(device.trigger)?;
        Ok(SessionOutcome::Completed { trains: completed })
    }
}
