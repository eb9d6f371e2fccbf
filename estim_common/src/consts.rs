//! System-wide constants for the estim workspace.
//!
//! Single source of truth for the switch-matrix topology and the
//! stimulator encoding limits. Imported by all crates.

use static_assertions::const_assert_eq;

/// Number of stimulation channels routed through the switch matrix.
pub const CHANNEL_COUNT: usize = 16;

/// Number of latch groups (one latch-enable line each).
pub const GROUP_COUNT: usize = 4;

/// Channels per latch group (one selector pair per intra-group position).
pub const CHANNELS_PER_GROUP: usize = 4;

const_assert_eq!(CHANNEL_COUNT, GROUP_COUNT * CHANNELS_PER_GROUP);

/// Magnitude mask of the sign-magnitude amplitude word (12 bits).
pub const AMPLITUDE_MAGNITUDE_MASK: u16 = 0x0FFF;

/// Largest amplitude magnitude the stimulator word can carry (µA or µV).
pub const MAX_AMPLITUDE_MAGNITUDE: i32 = AMPLITUDE_MAGNITUDE_MASK as i32;

/// Default sign bit position (newer firmware revisions).
pub const DEFAULT_SIGN_BIT: u8 = 15;

/// Default latch-enable hold time in microseconds.
pub const DEFAULT_LATCH_HOLD_US: u64 = 1000;

/// Upper bound accepted for the latch-enable hold time in microseconds.
pub const MAX_LATCH_HOLD_US: u64 = 10_000;

/// Canonical switch-matrix service name (logging).
pub const MATRIX_SERVICE_NAME: &str = "matrix";

/// Canonical stimulation service name (logging).
pub const STIM_SERVICE_NAME: &str = "stim";

/// Default configuration directory path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/estim";
