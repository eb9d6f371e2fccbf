//! Simulated stimulator transport.
//!
//! Accepts the same command sequence as a real device, keeps the uploaded
//! frames and records every call in order. A command name can be armed to
//! fail so error paths can be exercised without hardware.

use estim_common::stim::Modulation;
use estim_common::stim::encoding::DeviceFrame;
use estim_common::stim::transport::{StimulatorTransport, TransportError};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect,
    SetMode(Modulation),
    ClearChannel(u32),
    SendChannel { channel: u32, entries: usize },
    ClearSync(u32),
    SendSync { sync_out: u32, entries: usize },
    Start(u32),
    Stop(u32),
    Disconnect,
}

/// In-memory stimulator.
#[derive(Debug, Default)]
pub struct SimulatedStimulator {
    connected: bool,
    running: bool,
    mode: Option<Modulation>,
    channel_data: BTreeMap<u32, DeviceFrame>,
    sync_data: BTreeMap<u32, DeviceFrame>,
    calls: Vec<TransportCall>,
    fail_on: Option<&'static str>,
}

impl SimulatedStimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stimulator whose `command` (e.g. `"start"`) always fails.
    pub fn failing_on(command: &'static str) -> Self {
        Self {
            fail_on: Some(command),
            ..Self::default()
        }
    }

    /// Every call, in order.
    pub fn calls(&self) -> &[TransportCall] {
        &self.calls
    }

    /// Frame uploaded to a stimulation channel.
    pub fn channel_data(&self, channel: u32) -> Option<&DeviceFrame> {
        self.channel_data.get(&channel)
    }

    /// Frame uploaded to a sync output.
    pub fn sync_data(&self, sync_out: u32) -> Option<&DeviceFrame> {
        self.sync_data.get(&sync_out)
    }

    pub fn mode(&self) -> Option<Modulation> {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn command(&mut self, name: &'static str, call: TransportCall) -> Result<(), TransportError> {
        if name != "connect" && !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.calls.push(call);
        if self.fail_on == Some(name) {
            return Err(TransportError::CommandFailed {
                command: name,
                reason: "simulated failure".to_string(),
            });
        }
        debug!(command = name, "Simulated stimulator");
        Ok(())
    }
}

impl StimulatorTransport for SimulatedStimulator {
    fn name(&self) -> &str {
        "simulated"
    }

    fn connect(&mut self) -> Result<(), TransportError> {
        if self.fail_on == Some("connect") {
            return Err(TransportError::DeviceNotFound(
                "no simulated device attached".to_string(),
            ));
        }
        self.command("connect", TransportCall::Connect)?;
        self.connected = true;
        info!("Simulated stimulator connected");
        Ok(())
    }

    fn set_mode(&mut self, modulation: Modulation) -> Result<(), TransportError> {
        self.command("set_mode", TransportCall::SetMode(modulation))?;
        self.mode = Some(modulation);
        Ok(())
    }

    fn clear_channel_data(&mut self, channel: u32) -> Result<(), TransportError> {
        self.command("clear_channel_data", TransportCall::ClearChannel(channel))?;
        self.channel_data.remove(&channel);
        Ok(())
    }

    fn send_channel_data(
        &mut self,
        channel: u32,
        frame: &DeviceFrame,
    ) -> Result<(), TransportError> {
        self.command(
            "send_channel_data",
            TransportCall::SendChannel {
                channel,
                entries: frame.len(),
            },
        )?;
        self.channel_data.insert(channel, frame.clone());
        Ok(())
    }

    fn clear_sync_data(&mut self, sync_out: u32) -> Result<(), TransportError> {
        self.command("clear_sync_data", TransportCall::ClearSync(sync_out))?;
        self.sync_data.remove(&sync_out);
        Ok(())
    }

    fn send_sync_data(&mut self, sync_out: u32, frame: &DeviceFrame) -> Result<(), TransportError> {
        self.command(
            "send_sync_data",
            TransportCall::SendSync {
                sync_out,
                entries: frame.len(),
            },
        )?;
        self.sync_data.insert(sync_out, frame.clone());
        Ok(())
    }

    fn start(&mut self, trigger: u32) -> Result<(), TransportError> {
        self.command("start", TransportCall::Start(trigger))?;
        self.running = true;
        info!(trigger, "Simulated stimulation started");
        Ok(())
    }

    fn stop(&mut self, trigger: u32) -> Result<(), TransportError> {
        self.command("stop", TransportCall::Stop(trigger))?;
        self.running = false;
        info!(trigger, "Simulated stimulation stopped");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.command("disconnect", TransportCall::Disconnect)?;
        self.connected = false;
        self.running = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_require_connection() {
        let mut sim = SimulatedStimulator::new();
        assert_eq!(sim.start(1), Err(TransportError::NotConnected));
        sim.connect().unwrap();
        sim.start(1).unwrap();
        assert!(sim.is_running());
        sim.disconnect().unwrap();
        assert!(!sim.is_connected());
        assert_eq!(
            sim.calls(),
            &[
                TransportCall::Connect,
                TransportCall::Start(1),
                TransportCall::Disconnect
            ]
        );
    }

    #[test]
    fn armed_failure() {
        let mut sim = SimulatedStimulator::failing_on("set_mode");
        sim.connect().unwrap();
        assert!(matches!(
            sim.set_mode(Modulation::Voltage),
            Err(TransportError::CommandFailed {
                command: "set_mode",
                ..
            })
        ));
        assert_eq!(sim.mode(), None);

        let mut absent = SimulatedStimulator::failing_on("connect");
        assert!(matches!(
            absent.connect(),
            Err(TransportError::DeviceNotFound(_))
        ));
    }

    #[test]
    fn uploads_replace_previous_frame() {
        let mut sim = SimulatedStimulator::new();
        sim.connect().unwrap();
        let frame = DeviceFrame {
            amplitudes: vec![1, 0],
            durations: vec![10, 20],
        };
        sim.send_sync_data(0, &frame).unwrap();
        sim.clear_sync_data(0).unwrap();
        assert!(sim.sync_data(0).is_none());
        sim.send_channel_data(2, &frame).unwrap();
        assert_eq!(sim.channel_data(2), Some(&frame));
    }
}
