//! Device amplitude encoding.
//!
//! The stimulator takes 16-bit sign-magnitude words: the magnitude in the
//! low 12 bits and a single sign bit above it. Which bit carries the sign
//! differs between device families (bit 12 or bit 15), so it is a parameter
//! of the encoder rather than a constant.

use crate::consts::{AMPLITUDE_MAGNITUDE_MASK, DEFAULT_SIGN_BIT, MAX_AMPLITUDE_MAGNITUDE};
use crate::stim::error::StimError;
use crate::stim::sequence::{PulseEvent, PulseProgram};

/// Conversion between signed amplitudes and device words.
pub trait AmplitudeEncoder {
    /// Encode a signed amplitude.
    ///
    /// # Errors
    /// `StimError::AmplitudeOutOfRange` if the magnitude does not fit.
    fn encode(&self, amplitude: i32) -> Result<u16, StimError>;

    /// Decode a device word.
    fn decode(&self, word: u16) -> i32;
}

/// 12-bit magnitude plus a configurable sign bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignMagnitude {
    sign_bit: u8,
}

impl SignMagnitude {
    /// Lowest accepted sign bit (first bit above the magnitude).
    pub const MIN_SIGN_BIT: u8 = 12;
    /// Highest accepted sign bit.
    pub const MAX_SIGN_BIT: u8 = 15;

    /// Create an encoder placing the sign at `sign_bit`.
    pub fn new(sign_bit: u8) -> Result<Self, StimError> {
        if !(Self::MIN_SIGN_BIT..=Self::MAX_SIGN_BIT).contains(&sign_bit) {
            return Err(StimError::InvalidSignBit(sign_bit));
        }
        Ok(Self { sign_bit })
    }

    pub const fn sign_bit(&self) -> u8 {
        self.sign_bit
    }

    #[inline]
    const fn sign_mask(&self) -> u16 {
        1 << self.sign_bit
    }
}

impl Default for SignMagnitude {
    fn default() -> Self {
        Self {
            sign_bit: DEFAULT_SIGN_BIT,
        }
    }
}

impl AmplitudeEncoder for SignMagnitude {
    fn encode(&self, amplitude: i32) -> Result<u16, StimError> {
        let magnitude = amplitude.unsigned_abs();
        if magnitude > MAX_AMPLITUDE_MAGNITUDE as u32 {
            return Err(StimError::AmplitudeOutOfRange {
                amplitude: i64::from(amplitude),
                max: MAX_AMPLITUDE_MAGNITUDE,
            });
        }
        let mut word = magnitude as u16 & AMPLITUDE_MAGNITUDE_MASK;
        if amplitude < 0 {
            word |= self.sign_mask();
        }
        Ok(word)
    }

    fn decode(&self, word: u16) -> i32 {
        let magnitude = i32::from(word & AMPLITUDE_MAGNITUDE_MASK);
        if word & self.sign_mask() != 0 {
            -magnitude
        } else {
            magnitude
        }
    }
}

/// Parallel amplitude / duration arrays as handed to the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFrame {
    pub amplitudes: Vec<u16>,
    pub durations: Vec<u64>,
}

impl DeviceFrame {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    /// Sum of all durations [µs].
    pub fn duration_us(&self) -> u64 {
        self.durations.iter().sum()
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            amplitudes: Vec::with_capacity(capacity),
            durations: Vec::with_capacity(capacity),
        }
    }
}

/// Stimulation and sync frames of one program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedProgram {
    pub stim: DeviceFrame,
    pub sync: DeviceFrame,
}

/// Encode a stimulation sequence through `encoder`.
pub fn encode_sequence<E: AmplitudeEncoder + ?Sized>(
    events: &[PulseEvent],
    encoder: &E,
) -> Result<DeviceFrame, StimError> {
    let mut frame = DeviceFrame::with_capacity(events.len());
    for event in events {
        frame.amplitudes.push(encoder.encode(event.amplitude)?);
        frame.durations.push(event.duration_us);
    }
    Ok(frame)
}

/// Sync levels go to the device unencoded.
fn raw_sequence(events: &[PulseEvent]) -> Result<DeviceFrame, StimError> {
    let mut frame = DeviceFrame::with_capacity(events.len());
    for event in events {
        let level =
            u16::try_from(event.amplitude).map_err(|_| StimError::AmplitudeOutOfRange {
                amplitude: i64::from(event.amplitude),
                max: i32::from(u16::MAX),
            })?;
        frame.amplitudes.push(level);
        frame.durations.push(event.duration_us);
    }
    Ok(frame)
}

/// Encode both sequences of `program`.
pub fn encode_program<E: AmplitudeEncoder + ?Sized>(
    program: &PulseProgram,
    encoder: &E,
) -> Result<EncodedProgram, StimError> {
    Ok(EncodedProgram {
        stim: encode_sequence(&program.stim_sequence(), encoder)?,
        sync: raw_sequence(&program.sync_sequence())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn sign_bit_bounds() {
        assert!(SignMagnitude::new(12).is_ok());
        assert!(SignMagnitude::new(15).is_ok());
        assert_eq!(SignMagnitude::new(11), Err(StimError::InvalidSignBit(11)));
        assert_eq!(SignMagnitude::new(16), Err(StimError::InvalidSignBit(16)));
        assert_eq!(SignMagnitude::default().sign_bit(), 15);
    }

    #[test]
    fn known_words() {
        let bit15 = SignMagnitude::new(15).unwrap();
        assert_eq!(bit15.encode(100).unwrap(), 100);
        assert_eq!(bit15.encode(-100).unwrap(), 0x8000 | 100);
        assert_eq!(bit15.encode(-4095).unwrap(), 0x8FFF);

        let bit12 = SignMagnitude::new(12).unwrap();
        assert_eq!(bit12.encode(-1).unwrap(), 0x1001);
        assert_eq!(bit12.encode(0).unwrap(), 0);
    }

    #[test]
    fn decode_inverts_encode_and_is_injective() {
        for sign_bit in [12, 15] {
            let encoder = SignMagnitude::new(sign_bit).unwrap();
            let mut seen = HashSet::new();
            for amplitude in -4095..=4095 {
                let word = encoder.encode(amplitude).unwrap();
                assert_eq!(encoder.decode(word), amplitude, "bit {sign_bit}");
                assert!(seen.insert(word), "collision at {amplitude}");
            }
        }
    }

    #[test]
    fn out_of_range_rejected() {
        let encoder = SignMagnitude::default();
        assert_eq!(
            encoder.encode(4096),
            Err(StimError::AmplitudeOutOfRange {
                amplitude: 4096,
                max: 4095
            })
        );
        assert!(encoder.encode(i32::MIN).is_err());
    }

    #[test]
    fn sync_levels_are_raw() {
        let frame =
            raw_sequence(&[PulseEvent::new(1, 500), PulseEvent::rest(1500)]).unwrap();
        assert_eq!(frame.amplitudes, vec![1, 0]);
        assert_eq!(frame.duration_us(), 2_000);
    }
}
