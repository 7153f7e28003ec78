use anyhow::Result;
use midir::{MidiOutput, MidiOutputConnection};

use super::message::MidiMessage;
use crate::error::DeviceError;
use crate::types::events::NoteEvent;

/// Device selection value that creates a virtual output port
pub const VIRTUAL_PORT: &str = "virtual";

/// MIDI output handler
/// Owns the connection to the MIDI sink; a note still sounding when the
/// handler is dropped gets its note off sent first
pub struct MidiOutHandler {
    connection: MidiOutputConnection,
    pub port_name: String,
    sounding: Option<(u8, u8)>,
}

impl MidiOutHandler {
    /// Connect to output port `port_index` (in `list_devices` order)
    pub fn connect(port_index: usize, client_name: &str) -> Result<Self> {
        let midi_out = MidiOutput::new(client_name)
            .map_err(|e| DeviceError::MidiInit(e.to_string()))?;

        let ports = midi_out.ports();
        let port = ports.get(port_index).ok_or(DeviceError::IndexOutOfRange {
            kind: "MIDI output",
            index: port_index,
            count: ports.len(),
        })?;
        let port_name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());

        log::info!("Connecting to MIDI output '{}'", port_name);

        let connection = midi_out
            .connect(port, client_name)
            .map_err(|e| DeviceError::MidiConnect(e.to_string()))?;

        Ok(Self {
            connection,
            port_name,
            sounding: None,
        })
    }

    /// Create a virtual output port other applications can connect to
    #[cfg(unix)]
    pub fn create_virtual(port_name: &str) -> Result<Self> {
        use midir::os::unix::VirtualOutput;

        let midi_out = MidiOutput::new(port_name)
            .map_err(|e| DeviceError::MidiInit(e.to_string()))?;

        log::info!("Creating virtual MIDI output '{}'", port_name);

        let connection = midi_out
            .create_virtual(port_name)
            .map_err(|e| DeviceError::MidiConnect(e.to_string()))?;

        Ok(Self {
            connection,
            port_name: port_name.to_string(),
            sounding: None,
        })
    }

    #[cfg(not(unix))]
    pub fn create_virtual(_port_name: &str) -> Result<Self> {
        Err(DeviceError::VirtualPortUnsupported.into())
    }

    /// List all available MIDI output ports
    pub fn list_devices() -> Result<Vec<String>> {
        let midi_out = MidiOutput::new("pitch-to-midi-list")
            .map_err(|e| DeviceError::MidiInit(e.to_string()))?;

        let ports = midi_out.ports();
        Ok(label_ports(ports.iter().map(|port| midi_out.port_name(port))))
    }

    /// Send a note event and track which note is sounding
    pub fn send(&mut self, event: NoteEvent) -> Result<(), DeviceError> {
        self.send_message(MidiMessage::from(event))?;

        self.sounding = match event {
            NoteEvent::NoteOn { channel, note, .. } => Some((channel, note)),
            NoteEvent::NoteOff { channel, note, .. } if self.sounding == Some((channel, note)) => None,
            NoteEvent::NoteOff { .. } => self.sounding,
        };
        Ok(())
    }

    /// Note off for the sounding note, then All Notes Off on `channel`
    pub fn panic(&mut self, channel: u8) -> Result<(), DeviceError> {
        if let Some((sounding_channel, note)) = self.sounding.take() {
            self.send_message(MidiMessage::NoteOff {
                channel: sounding_channel,
                note,
                velocity: 0,
            })?;
        }
        self.send_message(MidiMessage::all_notes_off(channel))
    }

    fn send_message(&mut self, message: MidiMessage) -> Result<(), DeviceError> {
        self.connection
            .send(&message.to_bytes())
            .map_err(|e| DeviceError::MidiSend(e.to_string()))
    }
}

/// One label per port, in port order, so list positions match `connect` indices
fn label_ports<E>(names: impl Iterator<Item = Result<String, E>>) -> Vec<String> {
    names
        .enumerate()
        .map(|(index, name)| name.unwrap_or_else(|_| format!("Unknown port {}", index)))
        .collect()
}

impl Drop for MidiOutHandler {
    fn drop(&mut self) {
        if let Some((channel, note)) = self.sounding.take() {
            log::info!("Releasing note {} on shutdown", note);
            if let Err(err) = self.send_message(MidiMessage::NoteOff {
                channel,
                note,
                velocity: 0,
            }) {
                log::warn!("{}", err);
            }
        }
    }
}
