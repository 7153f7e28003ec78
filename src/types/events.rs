/// Note events emitted by the note controller
/// Forwarded to the MIDI output and the UI event log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    /// Note on with channel (0-15), note number and velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note off with channel (0-15), note number and release velocity
    NoteOff { channel: u8, note: u8, velocity: u8 },
}

impl NoteEvent {
    /// Create a note on event
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        NoteEvent::NoteOn { channel, note, velocity: velocity.min(127) }
    }

    /// Create a note off event
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        NoteEvent::NoteOff { channel, note, velocity: velocity.min(127) }
    }

    /// Note number carried by this event
    pub fn note(&self) -> u8 {
        match self {
            NoteEvent::NoteOn { note, .. } | NoteEvent::NoteOff { note, .. } => *note,
        }
    }

    /// Channel carried by this event
    pub fn channel(&self) -> u8 {
        match self {
            NoteEvent::NoteOn { channel, .. } | NoteEvent::NoteOff { channel, .. } => *channel,
        }
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self, NoteEvent::NoteOn { .. })
    }
}

/// Events produced for a single processing frame
/// At most one note off, then at most one note on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameEvents {
    pub note_off: Option<NoteEvent>,
    pub note_on: Option<NoteEvent>,
}

impl FrameEvents {
    /// No events this frame
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.note_off.is_none() && self.note_on.is_none()
    }

    /// Events in emission order: note off first
    pub fn iter(&self) -> impl Iterator<Item = NoteEvent> + '_ {
        self.note_off.iter().chain(self.note_on.iter()).copied()
    }
}
