//! Stimulator device transport.
//!
//! The session runner talks to the stimulator exclusively through
//! [`StimulatorTransport`]. Device discovery and the vendor handshake live
//! behind `connect()`; the session only sees channel / sync upload and the
//! trigger start / stop commands.

use crate::stim::config::Modulation;
use crate::stim::encoding::DeviceFrame;
use thiserror::Error;

/// Errors reported by a stimulator transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No device answered discovery.
    #[error("Stimulator not found: {0}")]
    DeviceNotFound(String),

    /// Device was found but the connection could not be opened.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Device rejected or failed a command.
    #[error("Command {command} failed: {reason}")]
    CommandFailed {
        command: &'static str,
        reason: String,
    },

    /// Command issued before `connect()` or after `disconnect()`.
    #[error("Stimulator not connected")]
    NotConnected,
}

/// Interface to a stimulator device.
///
/// # Lifecycle
///
/// 1. `connect()`
/// 2. `set_mode()`, `clear_*()` / `send_*()` uploads
/// 3. `start()` ... `stop()`
/// 4. `disconnect()`
pub trait StimulatorTransport: Send {
    /// Transport identifier (e.g., "simulated").
    fn name(&self) -> &str;

    /// Discover and open the device.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Select current or voltage output on all channels.
    fn set_mode(&mut self, modulation: Modulation) -> Result<(), TransportError>;

    /// Remove previously uploaded data of a stimulation channel.
    fn clear_channel_data(&mut self, channel: u32) -> Result<(), TransportError>;

    /// Upload the stimulation sequence of `channel`.
    fn send_channel_data(&mut self, channel: u32, frame: &DeviceFrame)
    -> Result<(), TransportError>;

    /// Remove previously uploaded data of a sync output.
    fn clear_sync_data(&mut self, sync_out: u32) -> Result<(), TransportError>;

    /// Upload the sync sequence of `sync_out`.
    fn send_sync_data(&mut self, sync_out: u32, frame: &DeviceFrame)
    -> Result<(), TransportError>;

    /// Start playback on `trigger`.
    fn start(&mut self, trigger: u32) -> Result<(), TransportError>;

    /// Stop playback on `trigger`.
    fn stop(&mut self, trigger: u32) -> Result<(), TransportError>;

    /// Close the device.
    fn disconnect(&mut self) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        let err = TransportError::CommandFailed {
            command: "send_channel_data",
            reason: "buffer full".to_string(),
        };
        assert_eq!(err.to_string(), "Command send_channel_data failed: buffer full");
        assert_eq!(
            TransportError::NotConnected.to_string(),
            "Stimulator not connected"
        );
    }
}
