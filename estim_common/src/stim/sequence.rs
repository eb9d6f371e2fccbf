//! Pulse-train sequencer.
//!
//! Expands a [`PulsePlan`] into two parallel time series of
//! `(amplitude, duration_us)` pairs:
//!
//! - **stimulation**: events of every train, inter-event gaps, and a rest
//!   after every train but the last so that each non-final train sums to
//!   exactly `train_budget_us`
//! - **sync**: `(1, trigger)` at the start of every train, followed by a
//!   `(0, train_budget_us - trigger)` filler between trains
//!
//! Zero-duration entries are never emitted.

use crate::stim::config::{PulsePlan, StimulationConfig, WaveformShape};
use crate::stim::error::StimError;
use tracing::debug;

/// Sync output level at the start of a train.
pub const SYNC_HIGH: i32 = 1;

/// One `(amplitude, duration)` entry of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PulseEvent {
    /// Signed amplitude [µA / µV], or the raw 0/1 level for sync entries.
    pub amplitude: i32,
    /// Duration [µs].
    pub duration_us: u64,
}

impl PulseEvent {
    pub const fn new(amplitude: i32, duration_us: u64) -> Self {
        Self {
            amplitude,
            duration_us,
        }
    }

    /// Zero-amplitude entry.
    pub const fn rest(duration_us: u64) -> Self {
        Self::new(0, duration_us)
    }
}

impl From<(i32, u64)> for PulseEvent {
    fn from((amplitude, duration_us): (i32, u64)) -> Self {
        Self::new(amplitude, duration_us)
    }
}

/// Stimulation and sync entries of one train.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainBlock {
    pub stim: Vec<PulseEvent>,
    pub sync: Vec<PulseEvent>,
}

impl TrainBlock {
    /// Sum of the stimulation durations [µs].
    pub fn stim_duration_us(&self) -> u64 {
        sum_durations(&self.stim)
    }

    /// Sum of the sync durations [µs].
    pub fn sync_duration_us(&self) -> u64 {
        sum_durations(&self.sync)
    }
}

/// Generated program, built fresh per run and consumed once by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulseProgram {
    /// Plan the program was generated from.
    pub plan: PulsePlan,
    /// One block per train, in order.
    pub trains: Vec<TrainBlock>,
}

impl PulseProgram {
    /// Normalize `config` and generate its program.
    pub fn from_config(config: &StimulationConfig) -> Result<Self, StimError> {
        generate(&config.normalize()?)
    }

    /// Flattened stimulation sequence.
    pub fn stim_sequence(&self) -> Vec<PulseEvent> {
        self.trains
            .iter()
            .flat_map(|t| t.stim.iter().copied())
            .collect()
    }

    /// Flattened sync sequence.
    pub fn sync_sequence(&self) -> Vec<PulseEvent> {
        self.trains
            .iter()
            .flat_map(|t| t.sync.iter().copied())
            .collect()
    }

    /// Duration of the full stimulation sequence [µs].
    pub fn total_duration_us(&self) -> u64 {
        self.trains.iter().map(TrainBlock::stim_duration_us).sum()
    }

    /// Wall-clock budget of one train including its rest [µs].
    pub fn train_duration_us(&self) -> u64 {
        self.plan.train_budget_us
    }

    /// Number of trains.
    pub fn train_count(&self) -> usize {
        self.trains.len()
    }
}

/// Generate the stimulation and sync sequences of `plan`.
///
/// # Errors
///
/// The plan's timing budget is re-validated; a negative rest or an
/// oversized trigger is rejected here as well as in `normalize()`.
pub fn generate(plan: &PulsePlan) -> Result<PulseProgram, StimError> {
    plan.validate()?;

    let rest_us = plan.rest_us();
    let filler_us = plan.train_budget_us - plan.trigger_us;
    let train_count = plan.train_count as usize;

    let mut trains = Vec::with_capacity(train_count);
    for index in 0..train_count {
        let last = index + 1 == train_count;
        let mut block = TrainBlock {
            stim: stim_train(plan),
            sync: Vec::with_capacity(2),
        };

        push(&mut block.sync, PulseEvent::new(SYNC_HIGH, plan.trigger_us));
        if !last {
            push(&mut block.stim, PulseEvent::rest(rest_us));
            push(&mut block.sync, PulseEvent::rest(filler_us));
        }
        trains.push(block);
    }

    debug!(
        shape = %plan.shape,
        trains = train_count,
        events = plan.event_count,
        rest_us,
        "Generated pulse program"
    );

    Ok(PulseProgram {
        plan: *plan,
        trains,
    })
}

/// Events and gaps of one train, without the trailing rest.
fn stim_train(plan: &PulsePlan) -> Vec<PulseEvent> {
    let events = plan.event_count as usize;
    let mut stim = Vec::with_capacity(events * 3);
    for event in 0..events {
        match plan.shape {
            WaveformShape::Monophasic | WaveformShape::Sinusoidal => {
                push(&mut stim, PulseEvent::new(plan.amplitude, plan.pulse_us));
            }
            WaveformShape::Biphasic => {
                push(&mut stim, PulseEvent::new(plan.amplitude, plan.pulse_us));
                push(&mut stim, PulseEvent::new(-plan.amplitude, plan.pulse_us));
            }
        }
        if event + 1 < events {
            push(&mut stim, PulseEvent::rest(plan.gap_us));
        }
    }
    stim
}

#[inline]
fn push(seq: &mut Vec<PulseEvent>, event: PulseEvent) {
    if event.duration_us > 0 {
        seq.push(event);
    }
}

fn sum_durations(seq: &[PulseEvent]) -> u64 {
    seq.iter().map(|e| e.duration_us).sum()
}
