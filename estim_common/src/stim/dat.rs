//! MC_Stimulus II ASCII import (`.dat`) export.
//!
//! The file lists, per output channel, the `(amplitude, duration)` rows of
//! that channel. The stimulation sequence goes to one channel, the sync
//! sequence to another; every other channel gets an empty block.
//!
//! ```text
//! Multi Channel Systems MC_Stimulus II
//! ASCII import Version 1.10
//!
//! channels:	8
//! output mode:	current
//! format:	5
//!
//! channel: 1
//! pulse	value	value	time
//! 0	0.000	100.000	100
//! ...
//! ```

use crate::stim::sequence::{PulseEvent, PulseProgram};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const HEADER: &str = "Multi Channel Systems MC_Stimulus II\nASCII import Version 1.10\n\n";
const FORMAT_VERSION: u8 = 5;

/// `.dat` export errors.
#[derive(Debug, Error)]
pub enum DatError {
    #[error("Invalid .dat layout: {0}")]
    InvalidLayout(String),

    #[error("Failed to write .dat file: {0}")]
    Io(#[from] io::Error),
}

fn default_channel_count() -> u8 {
    8
}

fn default_stim_channel() -> u8 {
    1
}

fn default_sync_channel() -> u8 {
    9
}

/// Channel assignment of the exported file.
///
/// The device exposes `channel_count` stimulation channels and as many
/// sync outputs; blocks `1..=2 * channel_count` are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatLayout {
    #[serde(default = "default_channel_count")]
    pub channel_count: u8,

    /// Block receiving the stimulation sequence.
    #[serde(default = "default_stim_channel")]
    pub stim_channel: u8,

    /// Block receiving the sync sequence.
    #[serde(default = "default_sync_channel")]
    pub sync_channel: u8,
}

impl DatLayout {
    fn block_count(&self) -> u16 {
        u16::from(self.channel_count) * 2
    }

    pub fn validate(&self) -> Result<(), DatError> {
        if self.channel_count == 0 {
            return Err(DatError::InvalidLayout(
                "channel_count must be at least 1".to_string(),
            ));
        }
        let blocks = self.block_count();
        for (name, channel) in [
            ("stim_channel", self.stim_channel),
            ("sync_channel", self.sync_channel),
        ] {
            if channel == 0 || u16::from(channel) > blocks {
                return Err(DatError::InvalidLayout(format!(
                    "{name} {channel} is not in 1..={blocks}"
                )));
            }
        }
        if self.stim_channel == self.sync_channel {
            return Err(DatError::InvalidLayout(format!(
                "stim_channel and sync_channel are both {}",
                self.stim_channel
            )));
        }
        Ok(())
    }
}

impl Default for DatLayout {
    fn default() -> Self {
        Self {
            channel_count: default_channel_count(),
            stim_channel: default_stim_channel(),
            sync_channel: default_sync_channel(),
        }
    }
}

/// Render `program` as `.dat` text.
pub fn render(program: &PulseProgram, layout: &DatLayout) -> Result<String, DatError> {
    layout.validate()?;

    let stim = program.stim_sequence();
    let sync = program.sync_sequence();

    let mut out = String::with_capacity(HEADER.len() + 32 * (stim.len() + sync.len()));
    out.push_str(HEADER);
    // String formatting is infallible.
    let _ = writeln!(out, "channels:\t{}", layout.channel_count);
    let _ = writeln!(out, "output mode:\t{}", program.plan.modulation);
    let _ = writeln!(out, "format:\t{FORMAT_VERSION}\n");

    for channel in 1..=layout.block_count() {
        let _ = writeln!(out, "channel: {channel}");
        out.push_str("pulse\tvalue\tvalue\ttime\n");
        let rows: &[PulseEvent] = if channel == u16::from(layout.stim_channel) {
            &stim
        } else if channel == u16::from(layout.sync_channel) {
            &sync
        } else {
            &[]
        };
        for row in rows {
            let _ = writeln!(
                out,
                "0\t0.000\t{:.3}\t{}",
                f64::from(row.amplitude),
                row.duration_us
            );
        }
        out.push('\n');
    }
    Ok(out)
}

/// Render and write to `path`.
pub fn write_file(
    path: impl AsRef<Path>,
    program: &PulseProgram,
    layout: &DatLayout,
) -> Result<(), DatError> {
    let path = path.as_ref();
    let text = render(program, layout)?;
    std::fs::write(path, text)?;
    info!(path = %path.display(), trains = program.train_count(), "Wrote .dat export");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stim::config::{Modulation, PulsePlan, WaveformShape};
    use crate::stim::sequence::generate;

    fn program() -> PulseProgram {
        generate(&PulsePlan {
            shape: WaveformShape::Biphasic,
            modulation: Modulation::Voltage,
            amplitude: 50,
            pulse_us: 100,
            event_count: 1,
            gap_us: 0,
            train_count: 2,
            train_budget_us: 1_000,
            trigger_us: 200,
        })
        .unwrap()
    }

    #[test]
    fn renders_header_and_blocks() {
        let text = render(&program(), &DatLayout::default()).unwrap();
        assert!(text.starts_with(
            "Multi Channel Systems MC_Stimulus II\nASCII import Version 1.10\n\nchannels:\t8\noutput mode:\tvoltage\nformat:\t5\n\n"
        ));
        assert_eq!(text.matches("channel: ").count(), 16);
        assert!(text.contains("channel: 16\npulse\tvalue\tvalue\ttime\n\n"));
    }

    #[test]
    fn rows_land_on_configured_channels() {
        let text = render(&program(), &DatLayout::default()).unwrap();
        let stim_block = "channel: 1\npulse\tvalue\tvalue\ttime\n\
            0\t0.000\t50.000\t100\n0\t0.000\t-50.000\t100\n0\t0.000\t0.000\t800\n\
            0\t0.000\t50.000\t100\n0\t0.000\t-50.000\t100\n\n";
        assert!(text.contains(stim_block), "{text}");
        let sync_block = "channel: 9\npulse\tvalue\tvalue\ttime\n\
            0\t0.000\t1.000\t200\n0\t0.000\t0.000\t800\n0\t0.000\t1.000\t200\n\n";
        assert!(text.contains(sync_block), "{text}");
    }

    #[test]
    fn invalid_layout_rejected() {
        let same = DatLayout {
            sync_channel: 1,
            ..Default::default()
        };
        assert!(matches!(
            render(&program(), &same),
            Err(DatError::InvalidLayout(_))
        ));

        let outside = DatLayout {
            channel_count: 2,
            ..Default::default()
        };
        assert!(outside.validate().is_err());
    }

    #[test]
    fn write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dat");
        write_file(&path, &program(), &DatLayout::default()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("channel: 9"));
    }
}
