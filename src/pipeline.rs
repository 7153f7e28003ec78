use crate::config::AppConfig;
use crate::dsp::level::{rms, rms_to_velocity};
use crate::dsp::pitch::PitchEstimator;
use crate::midi::controller::NoteEventController;
use crate::pitch::stabilizer::{PitchReading, PitchStabilizer};
use crate::types::events::{FrameEvents, NoteEvent};
use crate::types::note::{MIDI_NOTE_MAX, MIDI_NOTE_MIN};

/// Everything one processed window produces
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// Raw estimate in Hz (0.0 when unvoiced)
    pub raw_pitch: f32,
    /// Stabilizer output for display
    pub reading: PitchReading,
    /// Window loudness as a velocity (0-127)
    pub loudness: u8,
    /// Note events to forward to the MIDI output
    pub events: FrameEvents,
}

/// Per-frame chain: estimate -> stabilize -> note events
/// Owned and driven by the frame loop only
pub struct FrameProcessor {
    estimator: PitchEstimator,
    stabilizer: PitchStabilizer,
    controller: NoteEventController,
    velocity_gain: f32,
}

impl FrameProcessor {
    pub fn new(
        estimator: PitchEstimator,
        stabilizer: PitchStabilizer,
        controller: NoteEventController,
        velocity_gain: f32,
    ) -> Self {
        Self {
            estimator,
            stabilizer,
            controller,
            velocity_gain,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let estimator = PitchEstimator::new(
            config.capture.sample_rate,
            config.estimator.min_frequency,
            config.estimator.max_frequency,
            config.estimator.clarity_threshold,
        );
        Self::new(
            estimator,
            config.stabilizer.build(),
            config.notes.build(config.midi.channel_index()),
            config.notes.velocity_gain,
        )
    }

    /// Process one full window of samples
    pub fn process(&mut self, window: &[f32]) -> FrameOutput {
        let raw_pitch = self.estimator.estimate(window);
        let loudness = rms_to_velocity(rms(window), self.velocity_gain);
        let reading = self.stabilizer.process_pitch(raw_pitch);

        // "No pitch" (-1) clamps to 0, which the controller treats as silence
        let candidate = reading.midi_note.clamp(MIDI_NOTE_MIN, MIDI_NOTE_MAX) as u8;
        let events = self.controller.process(candidate, loudness);

        FrameOutput {
            raw_pitch,
            reading,
            loudness,
            events,
        }
    }

    pub fn active_note(&self) -> Option<u8> {
        self.controller.active_note()
    }

    pub fn channel(&self) -> u8 {
        self.controller.channel()
    }

    /// Start over, returning the note off for a sounding note
    pub fn reset(&mut self) -> Option<NoteEvent> {
        self.stabilizer.reset();
        self.controller.release()
    }

    /// Go silent without forgetting pitch history
    pub fn release(&mut self) -> Option<NoteEvent> {
        self.controller.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 44_100;
    const WINDOW: usize = 2205;

    fn sine(frequency: f32, amplitude: f32) -> Vec<f32> {
        (0..WINDOW)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    fn processor() -> FrameProcessor {
        FrameProcessor::from_config(&AppConfig::default())
    }

    fn run(processor: &mut FrameProcessor, window: &[f32], frames: usize) -> Vec<NoteEvent> {
        (0..frames)
            .flat_map(|_| processor.process(window).events.iter().collect::<Vec<_>>())
            .collect()
    }

    #[test]
    fn test_held_tone_plays_one_note() {
        let mut processor = processor();
        let events = run(&mut processor, &sine(220.0, 0.3), 100);

        assert_eq!(events.len(), 1);
        assert!(events[0].is_note_on());
        assert_eq!(events[0].note(), 57);
        assert_eq!(events[0].channel(), 0);
        assert_eq!(processor.active_note(), Some(57));

        let output = processor.process(&sine(220.0, 0.3));
        assert!(output.reading.is_stable);
        assert_eq!(output.reading.note_name, "A3");
        assert!((output.raw_pitch - 220.0).abs() < 2.0);
    }

    #[test]
    fn test_silence_releases_note() {
        let mut processor = processor();
        run(&mut processor, &sine(220.0, 0.3), 100);

        let output = processor.process(&vec![0.0; WINDOW]);
        assert_eq!(output.raw_pitch, 0.0);
        assert_eq!(output.reading.midi_note, -1);
        assert_eq!(output.loudness, 0);
        assert_eq!(
            output.events.iter().collect::<Vec<_>>(),
            vec![NoteEvent::note_off(0, 57, 0)]
        );
        assert_eq!(processor.active_note(), None);
    }

    #[test]
    fn test_note_change_is_off_then_on() {
        let mut processor = processor();
        run(&mut processor, &sine(220.0, 0.3), 100);

        // B3
        let events = run(&mut processor, &sine(246.94, 0.3), 100);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].note(), 57);
        assert!(!events[0].is_note_on());
        assert_eq!(events[1].note(), 59);
        assert!(events[1].is_note_on());
    }

    #[test]
    fn test_quiet_tone_stays_silent() {
        let mut processor = processor();
        let events = run(&mut processor, &sine(220.0, 0.005), 100);
        assert!(events.is_empty());
    }

    #[test]
    fn test_reset_releases_note() {
        let mut processor = processor();
        run(&mut processor, &sine(330.0, 0.3), 100);
        let note = processor.active_note().unwrap();

        let released = processor.reset();
        assert_eq!(released.map(|e| e.note()), Some(note));
        assert_eq!(processor.active_note(), None);
        assert!(!processor.process(&sine(330.0, 0.3)).reading.is_stable);
    }
}
