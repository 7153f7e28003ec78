use std::collections::VecDeque;

use crate::pitch::stabilizer::PitchReading;
use crate::types::events::NoteEvent;

/// Number of recent note events kept for display
pub const EVENT_LOG_LEN: usize = 12;

/// UI application state
/// Holds the latest per-frame values for display plus pending user requests
pub struct App {
    /// Latest stabilizer output
    pub reading: PitchReading,
    /// Latest raw estimate in Hz (0.0 when unvoiced)
    pub raw_pitch: f32,
    /// Latest loudness as a velocity (0-127)
    pub loudness: u8,
    /// Note currently sounding on the MIDI output
    pub active_note: Option<u8>,
    /// Most recent events, newest first
    pub recent_events: VecDeque<NoteEvent>,
    /// Processed frames since start
    pub frames: u64,
    /// Selected input device name
    pub audio_device: String,
    /// Selected MIDI output port name
    pub midi_port: String,
    /// MIDI channel (1-16) for display
    pub midi_channel: u8,
    /// Last error or notice, shown in the status bar
    pub status: Option<String>,
    /// Whether to quit the application
    pub should_quit: bool,
    reset_requested: bool,
    panic_requested: bool,
}

impl App {
    pub fn new(audio_device: String, midi_port: String, midi_channel: u8) -> Self {
        Self {
            reading: PitchReading::unvoiced(),
            raw_pitch: 0.0,
            loudness: 0,
            active_note: None,
            recent_events: VecDeque::with_capacity(EVENT_LOG_LEN),
            frames: 0,
            audio_device,
            midi_port,
            midi_channel,
            status: None,
            should_quit: false,
            reset_requested: false,
            panic_requested: false,
        }
    }

    /// Record the outcome of one processed frame
    pub fn update_frame(
        &mut self,
        raw_pitch: f32,
        reading: PitchReading,
        loudness: u8,
        active_note: Option<u8>,
    ) {
        self.raw_pitch = raw_pitch;
        self.reading = reading;
        self.loudness = loudness;
        self.active_note = active_note;
        self.frames += 1;
    }

    /// Add an emitted event to the log
    pub fn push_event(&mut self, event: NoteEvent) {
        if self.recent_events.len() == EVENT_LOG_LEN {
            self.recent_events.pop_back();
        }
        self.recent_events.push_front(event);
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Mark app for quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Ask the frame loop to reset the stabilizer and release the note
    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    /// Ask the frame loop to send a MIDI panic
    pub fn request_panic(&mut self) {
        self.panic_requested = true;
    }

    /// Consume a pending reset request
    pub fn take_reset(&mut self) -> bool {
        std::mem::take(&mut self.reset_requested)
    }

    /// Consume a pending panic request
    pub fn take_panic(&mut self) -> bool {
        std::mem::take(&mut self.panic_requested)
    }
}
