use crate::types::events::NoteEvent;

/// Controller number for All Notes Off
pub const CC_ALL_NOTES_OFF: u8 = 123;

/// Channel voice messages we send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiMessage {
    /// All Notes Off (MIDI panic) for one channel
    pub fn all_notes_off(channel: u8) -> Self {
        MidiMessage::ControlChange {
            channel,
            controller: CC_ALL_NOTES_OFF,
            value: 0,
        }
    }

    /// Encode as raw MIDI bytes: [status | channel, data1, data2]
    /// Data bytes are masked to 7 bits and the channel to 4 bits
    pub fn to_bytes(&self) -> [u8; 3] {
        let (status, channel, data1, data2) = match *self {
            MidiMessage::NoteOn { channel, note, velocity } => (0x90, channel, note, velocity),
            MidiMessage::NoteOff { channel, note, velocity } => (0x80, channel, note, velocity),
            MidiMessage::ControlChange { channel, controller, value } => {
                (0xB0, channel, controller, value)
            }
        };
        [status | (channel & 0x0F), data1 & 0x7F, data2 & 0x7F]
    }
}

impl From<NoteEvent> for MidiMessage {
    fn from(event: NoteEvent) -> Self {
        match event {
            // Velocity 0 on a note on would be read as a note off by receivers
            NoteEvent::NoteOn { channel, note, velocity } => MidiMessage::NoteOn {
                channel,
                note,
                velocity: velocity.max(1),
            },
            NoteEvent::NoteOff { channel, note, velocity } => {
                MidiMessage::NoteOff { channel, note, velocity }
            }
        }
    }
}
