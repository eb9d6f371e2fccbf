//! Stimulation configuration errors.
//!
//! Every variant is a configuration error: it is raised while normalizing
//! or encoding, before anything is sent to hardware, and is never retried.

use crate::channel::ChannelError;
use crate::units::UnitError;
use thiserror::Error;

/// Error type for stimulation configuration, sequencing and encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StimError {
    /// Event or train count is zero.
    #[error("{what} must be at least 1")]
    InvalidCount { what: &'static str },

    /// A duration that must be positive normalized to zero.
    #[error("{what} must be greater than zero")]
    ZeroDuration { what: &'static str },

    /// Quantity could not be normalized (negative, non-finite, unknown unit,
    /// zero frequency).
    #[error(transparent)]
    InvalidQuantity(#[from] UnitError),

    /// Amplitude magnitude exceeds the 12-bit device word.
    #[error("amplitude {amplitude} exceeds the representable magnitude {max}")]
    AmplitudeOutOfRange { amplitude: i64, max: i32 },

    /// Channel role assignment is invalid.
    #[error(transparent)]
    InvalidChannel(#[from] ChannelError),

    /// Train duration is shorter than the events it has to contain.
    #[error(
        "train duration {budget_us} us is shorter than its events ({required_us} us); rest would be negative"
    )]
    InsufficientTrainBudget { budget_us: u64, required_us: u64 },

    /// External trigger pulse is longer than the train duration.
    #[error("external trigger duration {trigger_us} us exceeds train duration {budget_us} us")]
    TriggerExceedsBudget { trigger_us: u64, budget_us: u64 },

    /// Sign bit outside the 12..=15 range of a 16-bit word above the magnitude.
    #[error("sign bit {0} is not in 12..=15")]
    InvalidSignBit(u8),
}
