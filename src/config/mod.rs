use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::midi::controller::NoteEventController;
use crate::pitch::stabilizer::PitchStabilizer;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub devices: DeviceConfig,

    #[serde(default)]
    pub midi: MidiConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub estimator: EstimatorConfig,

    #[serde(default)]
    pub stabilizer: StabilizerConfig,

    #[serde(default)]
    pub notes: NoteConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.midi.validate().context("Invalid midi configuration")?;
        self.capture.validate().context("Invalid capture configuration")?;
        self.estimator.validate().context("Invalid estimator configuration")?;
        self.stabilizer.validate().context("Invalid stabilizer configuration")?;
        self.notes.validate().context("Invalid notes configuration")?;

        // The analysis window must hold two periods of the lowest pitch
        let min_window = (2.0 * self.capture.sample_rate as f32 / self.estimator.min_frequency).ceil() as usize;
        if self.capture.buffer_capacity() < min_window {
            return Err(anyhow!(
                "frame_duration {}s is too short for min_frequency {} Hz (need {} samples, have {})",
                self.capture.frame_duration,
                self.estimator.min_frequency,
                min_window,
                self.capture.buffer_capacity()
            ));
        }

        Ok(())
    }
}

/// Device selection value for the host's default input device
pub const DEFAULT_DEVICE: &str = "default";

/// Device configuration
/// Each entry is a device index or a case-insensitive name substring
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    #[serde(default = "default_audioin")]
    pub audioin: String,

    #[serde(default = "default_midiout")]
    pub midiout: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            audioin: default_audioin(),
            midiout: default_midiout(),
        }
    }
}

/// MIDI output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    /// MIDI channel, 1-16
    #[serde(default = "default_channel")]
    pub channel: u8,

    /// Client name, and port name when creating a virtual port
    #[serde(default = "default_port_name")]
    pub port_name: String,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            port_name: default_port_name(),
        }
    }
}

impl MidiConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel < 1 || self.channel > 16 {
            return Err(anyhow!("MIDI channel must be between 1 and 16"));
        }
        if self.port_name.trim().is_empty() {
            return Err(anyhow!("MIDI port name must not be empty"));
        }
        Ok(())
    }

    /// Get the 0-indexed channel for the wire
    pub fn channel_index(&self) -> u8 {
        self.channel.saturating_sub(1)
    }
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Analysis window length in seconds
    #[serde(default = "default_frame_duration")]
    pub frame_duration: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_duration: default_frame_duration(),
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8_000 || self.sample_rate > 192_000 {
            return Err(anyhow!("Sample rate must be between 8000 and 192000 Hz"));
        }
        if !(self.frame_duration > 0.0 && self.frame_duration <= 1.0) {
            return Err(anyhow!("Frame duration must be between 0.0 (exclusive) and 1.0 seconds"));
        }
        Ok(())
    }

    /// Ring buffer capacity: sample_rate x frame_duration
    pub fn buffer_capacity(&self) -> usize {
        ((self.sample_rate as f32 * self.frame_duration).round() as usize).max(1)
    }
}

/// Pitch estimator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EstimatorConfig {
    #[serde(default = "default_min_frequency")]
    pub min_frequency: f32,

    #[serde(default = "default_max_frequency")]
    pub max_frequency: f32,

    /// Minimum normalized autocorrelation peak for a voiced frame
    #[serde(default = "default_clarity_threshold")]
    pub clarity_threshold: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            min_frequency: default_min_frequency(),
            max_frequency: default_max_frequency(),
            clarity_threshold: default_clarity_threshold(),
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_frequency > 0.0) {
            return Err(anyhow!("min_frequency must be > 0"));
        }
        if !(self.max_frequency > self.min_frequency) {
            return Err(anyhow!("max_frequency must be greater than min_frequency"));
        }
        if !(self.clarity_threshold > 0.0 && self.clarity_threshold <= 1.0) {
            return Err(anyhow!("clarity_threshold must be between 0.0 (exclusive) and 1.0"));
        }
        Ok(())
    }
}

/// Pitch stabilizer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StabilizerConfig {
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    #[serde(default = "default_stability_threshold_hz")]
    pub stability_threshold_hz: f32,

    /// Frames a note must pass the stability check before it is confirmed
    #[serde(default = "default_stabilizer_min_stable_frames")]
    pub min_stable_frames: usize,

    #[serde(default = "default_smoothing_size")]
    pub smoothing_size: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            stability_threshold_hz: default_stability_threshold_hz(),
            min_stable_frames: default_stabilizer_min_stable_frames(),
            smoothing_size: default_smoothing_size(),
        }
    }
}

impl StabilizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.history_size == 0 {
            return Err(anyhow!("history_size must be > 0"));
        }
        if !(self.stability_threshold_hz > 0.0) {
            return Err(anyhow!("stability_threshold_hz must be > 0"));
        }
        if self.min_stable_frames == 0 {
            return Err(anyhow!("min_stable_frames must be > 0"));
        }
        if self.smoothing_size == 0 {
            return Err(anyhow!("smoothing_size must be > 0"));
        }
        // The stability window is taken from the pitch history
        if self.min_stable_frames > self.history_size {
            return Err(anyhow!(
                "min_stable_frames ({}) must not exceed history_size ({})",
                self.min_stable_frames,
                self.history_size
            ));
        }
        Ok(())
    }

    pub fn build(&self) -> PitchStabilizer {
        PitchStabilizer::new(
            self.history_size,
            self.stability_threshold_hz,
            self.min_stable_frames,
            self.smoothing_size,
        )
    }
}

/// Note event configuration (outer debounce and loudness gate)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NoteConfig {
    /// Frames a new note must persist before the sounding note changes
    #[serde(default = "default_note_min_stable_frames")]
    pub min_stable_frames: usize,

    /// Velocity below which a frame counts as silence
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: u8,

    /// RMS to velocity scale factor
    #[serde(default = "default_velocity_gain")]
    pub velocity_gain: f32,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            min_stable_frames: default_note_min_stable_frames(),
            silence_threshold: default_silence_threshold(),
            velocity_gain: default_velocity_gain(),
        }
    }
}

impl NoteConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_stable_frames == 0 {
            return Err(anyhow!("min_stable_frames must be > 0"));
        }
        if self.silence_threshold > 127 {
            return Err(anyhow!("silence_threshold must be between 0 and 127"));
        }
        if !(self.velocity_gain > 0.0) {
            return Err(anyhow!("velocity_gain must be > 0"));
        }
        Ok(())
    }

    pub fn build(&self, channel: u8) -> NoteEventController {
        NoteEventController::new(channel, self.min_stable_frames, self.silence_threshold)
    }
}

// Default value functions for serde
fn default_audioin() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_midiout() -> String {
    crate::midi::handler::VIRTUAL_PORT.to_string()
}

fn default_channel() -> u8 {
    1
}

fn default_port_name() -> String {
    "pitch-to-midi".to_string()
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_frame_duration() -> f32 {
    0.05
}

fn default_min_frequency() -> f32 {
    60.0
}

fn default_max_frequency() -> f32 {
    1200.0
}

fn default_clarity_threshold() -> f32 {
    0.5
}

fn default_history_size() -> usize {
    10
}

fn default_stability_threshold_hz() -> f32 {
    5.0
}

fn default_stabilizer_min_stable_frames() -> usize {
    3
}

fn default_smoothing_size() -> usize {
    5
}

fn default_note_min_stable_frames() -> usize {
    15
}

fn default_silence_threshold() -> u8 {
    10
}

fn default_velocity_gain() -> f32 {
    600.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
devices:
  audioin: "usb"
  midiout: "IAC"

midi:
  channel: 3
  port_name: "voice"

capture:
  sample_rate: 48000
  frame_duration: 0.04

estimator:
  min_frequency: 80.0
  max_frequency: 1000.0
  clarity_threshold: 0.7

stabilizer:
  history_size: 8
  stability_threshold_hz: 3.5
  min_stable_frames: 4
  smoothing_size: 7

notes:
  min_stable_frames: 12
  silence_threshold: 20
  velocity_gain: 400.0
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.devices.audioin, "usb");
        assert_eq!(config.devices.midiout, "IAC");
        assert_eq!(config.midi.channel_index(), 2);
        assert_eq!(config.capture.buffer_capacity(), 1920);
        assert_eq!(config.stabilizer.history_size, 8);
        assert_eq!(config.stabilizer.min_stable_frames, 4);
        assert_eq!(config.notes.min_stable_frames, 12);
        assert_eq!(config.notes.silence_threshold, 20);
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.devices.audioin, "default");
        assert_eq!(config.devices.midiout, "virtual");
        assert_eq!(config.midi.channel, 1);
        assert_eq!(config.capture.sample_rate, 44_100);
        assert_eq!(config.capture.buffer_capacity(), 2205);
        assert_eq!(config.stabilizer.history_size, 10);
        assert_eq!(config.stabilizer.stability_threshold_hz, 5.0);
        assert_eq!(config.stabilizer.min_stable_frames, 3);
        assert_eq!(config.stabilizer.smoothing_size, 5);
        assert_eq!(config.notes.min_stable_frames, 15);
        assert_eq!(config.notes.silence_threshold, 10);
    }

    #[test]
    fn test_partial_section_uses_field_defaults() {
        let yaml = r#"
stabilizer:
  history_size: 6
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.stabilizer.history_size, 6);
        assert_eq!(config.stabilizer.smoothing_size, 5);
        assert_eq!(config.notes.min_stable_frames, 15);
    }

    #[test]
    fn test_default_matches_empty_yaml() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture.buffer_capacity(), 2205);
    }

    #[test]
    fn test_validate_midi_channel_range() {
        let yaml = r#"
midi:
  channel: 17
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());

        let yaml = r#"
midi:
  channel: 0
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_stabilizer_values() {
        for yaml in [
            "stabilizer:\n  history_size: 0\n",
            "stabilizer:\n  smoothing_size: 0\n",
            "stabilizer:\n  min_stable_frames: 0\n",
            "stabilizer:\n  stability_threshold_hz: 0.0\n",
            "stabilizer:\n  history_size: 4\n  min_stable_frames: 6\n",
            "notes:\n  min_stable_frames: 0\n",
            "notes:\n  velocity_gain: -1.0\n",
        ] {
            let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
            assert!(config.validate().is_err(), "accepted: {}", yaml);
        }
    }

    #[test]
    fn test_stabilizer_window_may_fill_history() {
        let yaml = "stabilizer:\n  history_size: 4\n  min_stable_frames: 4\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_frequency_range() {
        let yaml = r#"
estimator:
  min_frequency: 500.0
  max_frequency: 400.0
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_window_covers_lowest_pitch() {
        // 10ms at 44.1kHz is 441 samples; 60 Hz needs 1470
        let yaml = r#"
capture:
  frame_duration: 0.01
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_silence_threshold_out_of_range() {
        let yaml = r#"
notes:
  silence_threshold: 200
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/pitch-to-midi.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
