use super::stages::{apply_hysteresis, History, MajorityVote, MedianSmoother, Spread};
use crate::types::note::{
    frequency_to_midi_note, midi_note_to_frequency, midi_note_to_note_name, NO_NOTE,
};

/// Result of stabilizing one frame
#[derive(Debug, Clone, PartialEq)]
pub struct PitchReading {
    /// Pitch in Hz (0.0 when unvoiced)
    pub pitch: f32,
    /// MIDI note number (-1 when unvoiced)
    pub midi_note: i32,
    /// Note name like "A4" ("N/A" when unvoiced)
    pub note_name: String,
    /// Whether the reading has been confirmed stable
    pub is_stable: bool,
}

impl PitchReading {
    fn new(pitch: f32, midi_note: i32, is_stable: bool) -> Self {
        Self {
            pitch,
            midi_note,
            note_name: midi_note_to_note_name(midi_note),
            is_stable,
        }
    }

    /// Reading for a frame without pitch
    pub fn unvoiced() -> Self {
        Self::new(0.0, NO_NOTE, false)
    }
}

/// Belief about the currently held pitch
#[derive(Debug, Clone, Copy)]
struct StableState {
    pitch: f32,
    midi_note: i32,
    run_length: usize,
}

impl Default for StableState {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            midi_note: NO_NOTE,
            run_length: 0,
        }
    }
}

/// Turns a jittery per-frame pitch estimate into a stable pitch and note
///
/// Each voiced frame passes through four stages:
/// median smoothing, hysteresis around the last stable pitch, a majority
/// vote over recent notes, and a stability check on the spread of recent
/// pitches. A reading is only reported stable after the same note has
/// passed the stability check for `min_stable_frames` frames in a row.
///
/// Not thread-safe: drive it from a single loop, once per frame.
pub struct PitchStabilizer {
    smoother: MedianSmoother,
    vote: MajorityVote,
    pitch_history: History<f32>,
    stability_threshold_hz: f32,
    min_stable_frames: usize,
    stable: StableState,
}

impl PitchStabilizer {
    pub fn new(
        history_size: usize,
        stability_threshold_hz: f32,
        min_stable_frames: usize,
        smoothing_size: usize,
    ) -> Self {
        Self {
            smoother: MedianSmoother::new(smoothing_size),
            vote: MajorityVote::new(history_size),
            pitch_history: History::new(history_size),
            stability_threshold_hz,
            min_stable_frames,
            stable: StableState::default(),
        }
    }

    /// Feed one raw estimate (Hz, <= 0 for unvoiced) and get this frame's reading
    pub fn process_pitch(&mut self, raw_pitch: f32) -> PitchReading {
        // Unvoiced frames never touch the filters
        if !(raw_pitch > 0.0) {
            return PitchReading::unvoiced();
        }

        let smoothed = self.smoother.process(raw_pitch);
        let filtered = apply_hysteresis(smoothed, self.stable.pitch).pitch();

        let candidate = frequency_to_midi_note(filtered);
        let voted_note = self.vote.vote(candidate).note;
        let voted_pitch = if voted_note == candidate {
            filtered
        } else {
            midi_note_to_frequency(voted_note)
        };

        self.pitch_history.push(voted_pitch);
        if self.pitch_history.len() < self.min_stable_frames {
            return PitchReading::new(voted_pitch, voted_note, false);
        }

        let spread = match Spread::of(&self.pitch_history) {
            Some(spread) if spread.max_deviation < self.stability_threshold_hz => spread,
            _ => {
                self.stable.run_length = 0;
                return PitchReading::new(voted_pitch, voted_note, false);
            }
        };

        if voted_note == self.stable.midi_note {
            self.stable.run_length += 1;
        } else {
            log::trace!(
                "stable note candidate {} -> {} ({:.2} Hz)",
                self.stable.midi_note,
                voted_note,
                spread.mean
            );
            self.stable = StableState {
                pitch: spread.mean,
                midi_note: voted_note,
                run_length: 1,
            };
        }

        if self.stable.run_length >= self.min_stable_frames {
            PitchReading::new(self.stable.pitch, self.stable.midi_note, true)
        } else {
            PitchReading::new(voted_pitch, voted_note, false)
        }
    }

    /// Last note that passed the stability check (-1 if none yet)
    pub fn last_stable_midi_note(&self) -> i32 {
        self.stable.midi_note
    }

    /// Pitch adopted with the last stable note (0.0 if none yet)
    pub fn last_stable_pitch(&self) -> f32 {
        self.stable.pitch
    }

    /// Forget all history and stable state
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.vote.reset();
        self.pitch_history.clear();
        self.stable = StableState::default();
    }
}
