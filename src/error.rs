use thiserror::Error;

/// Failures talking to audio or MIDI devices
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{kind} device '{query}' not found")]
    NotFound { kind: &'static str, query: String },

    #[error("{kind} device index {index} out of range ({count} available)")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    #[error("No {0} devices found")]
    NoDevices(&'static str),

    #[error("Failed to initialise MIDI output: {0}")]
    MidiInit(String),

    #[error("Failed to connect to MIDI port: {0}")]
    MidiConnect(String),

    #[error("Failed to send MIDI message: {0}")]
    MidiSend(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Virtual MIDI ports are not supported on this platform")]
    VirtualPortUnsupported,
}
