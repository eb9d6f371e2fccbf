//! Channel roles and the 16-channel switch-matrix state.
//!
//! Each stimulation channel is routed by the switch matrix to one of four
//! roles. The role is encoded as a 2-bit selector code that the matrix
//! driver writes to the selector pair of the channel's intra-group position.

use crate::consts::{CHANNEL_COUNT, CHANNELS_PER_GROUP, GROUP_COUNT};
use bitflags::bitflags;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors for channel addressing and signal parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Channel id outside `1..=16`.
    #[error("{0} is not a valid channel (expected 1..={max})", max = CHANNEL_COUNT)]
    InvalidChannel(i64),

    /// Signal letter other than A/C/G/F.
    #[error("{signal:?} is not a valid signal at channel {channel} (expected A, C, G or F)")]
    InvalidSignal { channel: usize, signal: String },

    /// Signal string of the wrong length.
    #[error("expected {expected} signals, got {got}", expected = CHANNEL_COUNT)]
    WrongSignalCount { got: usize },
}

// ─── ChannelRole ────────────────────────────────────────────────────

/// Role of one electrode channel in the switch matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelRole {
    /// Disconnected (high impedance).
    #[default]
    #[serde(rename = "F", alias = "Floating", alias = "floating")]
    Floating,
    /// Current sink.
    #[serde(rename = "C", alias = "Cathode", alias = "cathode")]
    Cathode,
    /// Current source.
    #[serde(rename = "A", alias = "Anode", alias = "anode")]
    Anode,
    /// Tied to ground.
    #[serde(rename = "G", alias = "Ground", alias = "ground")]
    Ground,
}

impl ChannelRole {
    /// All roles, in selector-code order.
    pub const ALL: [Self; 4] = [Self::Floating, Self::Cathode, Self::Anode, Self::Ground];

    /// Single-letter signal symbol.
    pub const fn letter(self) -> char {
        match self {
            Self::Floating => 'F',
            Self::Cathode => 'C',
            Self::Anode => 'A',
            Self::Ground => 'G',
        }
    }

    /// Parse a single-letter signal symbol.
    pub const fn from_letter(c: char) -> Option<Self> {
        match c {
            'F' => Some(Self::Floating),
            'C' => Some(Self::Cathode),
            'A' => Some(Self::Anode),
            'G' => Some(Self::Ground),
            _ => None,
        }
    }

    /// Selector code driven onto the channel's selector pair.
    pub const fn selector_bits(self) -> SelectorBits {
        match self {
            Self::Floating => SelectorBits::empty(),
            Self::Cathode => SelectorBits::BIT0,
            Self::Anode => SelectorBits::BIT1,
            Self::Ground => SelectorBits::all(),
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for ChannelRole {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "F" | "Floating" | "floating" => Ok(Self::Floating),
            "C" | "Cathode" | "cathode" => Ok(Self::Cathode),
            "A" | "Anode" | "anode" => Ok(Self::Anode),
            "G" | "Ground" | "ground" => Ok(Self::Ground),
            _ => Err(format!("unknown ChannelRole: {s:?}, expected A, C, G or F")),
        }
    }
}

// ─── SelectorBits ───────────────────────────────────────────────────

bitflags! {
    /// 2-bit selector code of one selector pair.
    ///
    /// `Cathode → (1,0)`, `Anode → (0,1)`, `Ground → (1,1)`,
    /// `Floating → (0,0)` written as `(bit0, bit1)`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SelectorBits: u8 {
        /// First line of the pair.
        const BIT0 = 0b01;
        /// Second line of the pair.
        const BIT1 = 0b10;
    }
}

impl SelectorBits {
    /// Build from the two line levels.
    pub fn from_levels(bit0: bool, bit1: bool) -> Self {
        let mut bits = Self::empty();
        bits.set(Self::BIT0, bit0);
        bits.set(Self::BIT1, bit1);
        bits
    }

    /// Level of the first line.
    #[inline]
    pub const fn bit0(self) -> bool {
        self.contains(Self::BIT0)
    }

    /// Level of the second line.
    #[inline]
    pub const fn bit1(self) -> bool {
        self.contains(Self::BIT1)
    }

    /// Role encoded by this selector code.
    pub const fn role(self) -> ChannelRole {
        match (self.bit0(), self.bit1()) {
            (false, false) => ChannelRole::Floating,
            (true, false) => ChannelRole::Cathode,
            (false, true) => ChannelRole::Anode,
            (true, true) => ChannelRole::Ground,
        }
    }
}

impl Default for SelectorBits {
    fn default() -> Self {
        Self::empty()
    }
}

// ─── Addressing ─────────────────────────────────────────────────────

/// Validate a 1-based channel id and return its 0-based index.
pub fn channel_index(channel: i64) -> Result<usize, ChannelError> {
    if (1..=CHANNEL_COUNT as i64).contains(&channel) {
        Ok((channel - 1) as usize)
    } else {
        Err(ChannelError::InvalidChannel(channel))
    }
}

/// Latch group of a 0-based channel index.
#[inline]
pub const fn group_of(index: usize) -> usize {
    index / CHANNELS_PER_GROUP
}

/// Intra-group position (selector pair) of a 0-based channel index.
#[inline]
pub const fn position_of(index: usize) -> usize {
    index % CHANNELS_PER_GROUP
}

// ─── ChannelState ───────────────────────────────────────────────────

/// Desired role of all 16 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelState([ChannelRole; CHANNEL_COUNT]);

impl ChannelState {
    /// All channels floating.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an explicit role array (index 0 = channel 1).
    pub const fn from_roles(roles: [ChannelRole; CHANNEL_COUNT]) -> Self {
        Self(roles)
    }

    /// All channels set to the same role.
    pub const fn uniform(role: ChannelRole) -> Self {
        Self([role; CHANNEL_COUNT])
    }

    /// Role array (index 0 = channel 1).
    pub const fn roles(&self) -> &[ChannelRole; CHANNEL_COUNT] {
        &self.0
    }

    /// Role of a 1-based channel.
    pub fn get(&self, channel: i64) -> Result<ChannelRole, ChannelError> {
        Ok(self.0[channel_index(channel)?])
    }

    /// Set the role of a 1-based channel.
    pub fn set(&mut self, channel: i64, role: ChannelRole) -> Result<(), ChannelError> {
        self.0[channel_index(channel)?] = role;
        Ok(())
    }

    /// Apply every entry of a role map.
    pub fn apply(&mut self, roles: &ChannelRoles) {
        for (&channel, &role) in roles.iter() {
            // ChannelRoles keys are validated on construction.
            self.0[channel as usize - 1] = role;
        }
    }

    /// Roles of the 4 channels of latch group `group`.
    pub fn group(&self, group: usize) -> [ChannelRole; CHANNELS_PER_GROUP] {
        debug_assert!(group < GROUP_COUNT);
        let start = group * CHANNELS_PER_GROUP;
        let mut roles = [ChannelRole::Floating; CHANNELS_PER_GROUP];
        roles.copy_from_slice(&self.0[start..start + CHANNELS_PER_GROUP]);
        roles
    }

    /// Parse a 16-letter A/C/G/F signal string.
    ///
    /// Validation is all-or-nothing: an invalid letter anywhere rejects the
    /// whole string.
    pub fn parse_signals(signals: &str) -> Result<Self, ChannelError> {
        let count = signals.chars().count();
        if count != CHANNEL_COUNT {
            return Err(ChannelError::WrongSignalCount { got: count });
        }
        let mut roles = [ChannelRole::Floating; CHANNEL_COUNT];
        for (idx, c) in signals.chars().enumerate() {
            roles[idx] = ChannelRole::from_letter(c).ok_or_else(|| ChannelError::InvalidSignal {
                channel: idx + 1,
                signal: c.to_string(),
            })?;
        }
        Ok(Self(roles))
    }
}

impl FromStr for ChannelState {
    type Err = ChannelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_signals(s)
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for role in &self.0 {
            write!(f, "{}", role.letter())?;
        }
        Ok(())
    }
}

// ─── ChannelRoles ───────────────────────────────────────────────────

/// Sparse channel → role assignment from a configuration file.
///
/// Keys are 1-based channel ids. In TOML / JSON the keys are strings,
/// either `"3"` or `"Channel 3"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, ChannelRole>", into = "BTreeMap<String, ChannelRole>")]
pub struct ChannelRoles(BTreeMap<u8, ChannelRole>);

impl ChannelRoles {
    /// Empty assignment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a role to a 1-based channel.
    pub fn insert(&mut self, channel: i64, role: ChannelRole) -> Result<(), ChannelError> {
        let idx = channel_index(channel)?;
        self.0.insert(idx as u8 + 1, role);
        Ok(())
    }

    /// Iterate `(channel, role)` in channel order.
    pub fn iter(&self) -> impl Iterator<Item = (&u8, &ChannelRole)> {
        self.0.iter()
    }

    /// Number of assigned channels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no channel is assigned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<String, ChannelRole>> for ChannelRoles {
    type Error = ChannelError;

    fn try_from(map: BTreeMap<String, ChannelRole>) -> Result<Self, Self::Error> {
        let mut roles = Self::new();
        for (key, role) in map {
            let trimmed = key.trim();
            let number = trimmed
                .strip_prefix("Channel")
                .or_else(|| trimmed.strip_prefix("channel"))
                .unwrap_or(trimmed)
                .trim();
            let channel: i64 = number.parse().map_err(|_| ChannelError::InvalidChannel(-1))?;
            roles.insert(channel, role)?;
        }
        Ok(roles)
    }
}

impl From<ChannelRoles> for BTreeMap<String, ChannelRole> {
    fn from(roles: ChannelRoles) -> Self {
        roles
            .0
            .into_iter()
            .map(|(channel, role)| (channel.to_string(), role))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_codes() {
        assert_eq!(
            ChannelRole::Cathode.selector_bits(),
            SelectorBits::from_levels(true, false)
        );
        assert_eq!(
            ChannelRole::Anode.selector_bits(),
            SelectorBits::from_levels(false, true)
        );
        assert_eq!(
            ChannelRole::Ground.selector_bits(),
            SelectorBits::from_levels(true, true)
        );
        assert_eq!(
            ChannelRole::Floating.selector_bits(),
            SelectorBits::from_levels(false, false)
        );
        for role in ChannelRole::ALL {
            assert_eq!(role.selector_bits().role(), role);
        }
    }

    #[test]
    fn channel_addressing() {
        assert_eq!(channel_index(1), Ok(0));
        assert_eq!(channel_index(16), Ok(15));
        assert_eq!(channel_index(0), Err(ChannelError::InvalidChannel(0)));
        assert_eq!(channel_index(17), Err(ChannelError::InvalidChannel(17)));
        // channel 6 -> group 1, position 1
        assert_eq!(group_of(5), 1);
        assert_eq!(position_of(5), 1);
    }

    #[test]
    fn parse_and_display_signals() {
        let state: ChannelState = "CAGGFFFFGGGGAAAA".parse().unwrap();
        assert_eq!(state.get(1), Ok(ChannelRole::Cathode));
        assert_eq!(state.get(2), Ok(ChannelRole::Anode));
        assert_eq!(state.get(16), Ok(ChannelRole::Anode));
        assert_eq!(state.to_string(), "CAGGFFFFGGGGAAAA");
        assert_eq!(state.group(1), [ChannelRole::Floating; 4]);
    }

    #[test]
    fn parse_signals_rejects_bad_input() {
        assert_eq!(
            ChannelState::parse_signals("CAG"),
            Err(ChannelError::WrongSignalCount { got: 3 })
        );
        let err = ChannelState::parse_signals("CAGGFFFFGGGGAAAX").unwrap_err();
        assert_eq!(
            err,
            ChannelError::InvalidSignal {
                channel: 16,
                signal: "X".to_string()
            }
        );
    }

    #[test]
    fn default_state_is_floating() {
        let state = ChannelState::new();
        assert_eq!(state.to_string(), "FFFFFFFFFFFFFFFF");
    }

    #[test]
    fn roles_from_toml_keys() {
        #[derive(Deserialize)]
        struct Wrapper {
            roles: ChannelRoles,
        }
        let w: Wrapper = toml::from_str(
            r#"
[roles]
"1" = "C"
"Channel 2" = "Anode"
"16" = "ground"
"#,
        )
        .unwrap();
        let mut state = ChannelState::new();
        state.apply(&w.roles);
        assert_eq!(state.to_string(), "CAFFFFFFFFFFFFFG");
    }

    #[test]
    fn roles_reject_out_of_range_channel() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Wrapper {
            roles: ChannelRoles,
        }
        let result: Result<Wrapper, _> = toml::from_str("[roles]\n\"17\" = \"C\"\n");
        assert!(result.is_err());
    }
}
