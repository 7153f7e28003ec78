/// MIDI note / frequency conversion using equal temperament
/// A440 tuning: MIDI note 69 = 440 Hz

const A4: f32 = 440.0;
const A4_MIDI: i32 = 69;

/// Lowest and highest valid MIDI note numbers
pub const MIDI_NOTE_MIN: i32 = 0;
pub const MIDI_NOTE_MAX: i32 = 127;

/// Sentinel note number for "no pitch"
pub const NO_NOTE: i32 = -1;

/// Sentinel note name for "no pitch" / out-of-range notes
pub const NO_NOTE_NAME: &str = "N/A";

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Convert frequency in Hz to the nearest MIDI note number
/// Returns -1 for frequencies <= 0, otherwise clamps to 0-127
pub fn frequency_to_midi_note(frequency: f32) -> i32 {
    if !(frequency > 0.0) {
        return NO_NOTE;
    }

    let semitones = 12.0 * (frequency / A4).log2();
    (A4_MIDI + semitones.round() as i32).clamp(MIDI_NOTE_MIN, MIDI_NOTE_MAX)
}

/// Convert MIDI note number to frequency in Hz
/// Uses equal temperament: f = 440 * 2^((n-69)/12), 0.0 for out-of-range notes
pub fn midi_note_to_frequency(note: i32) -> f32 {
    if !(MIDI_NOTE_MIN..=MIDI_NOTE_MAX).contains(&note) {
        return 0.0;
    }

    let semitones = note - A4_MIDI;
    A4 * 2.0_f32.powf(semitones as f32 / 12.0)
}

/// Convert MIDI note number to a name like "A4" or "C#3"
pub fn midi_note_to_note_name(note: i32) -> String {
    if !(MIDI_NOTE_MIN..=MIDI_NOTE_MAX).contains(&note) {
        return NO_NOTE_NAME.to_string();
    }

    let pitch_class = NOTE_NAMES[(note % 12) as usize];
    let octave = note / 12 - 1;
    format!("{}{}", pitch_class, octave)
}

/// Distance between two notes in cents
pub fn cents_between(from_note: i32, to_note: i32) -> i32 {
    (to_note - from_note) * 100
}

/// Distance between two frequencies in cents: 1200 * log2(to / from)
pub fn cents_between_frequencies(from: f32, to: f32) -> f32 {
    1200.0 * (to / from).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_conversion() {
        assert_eq!(frequency_to_midi_note(440.0), 69);
        let freq = midi_note_to_frequency(69);
        assert!((freq - 440.0).abs() < 0.01);
    }

    #[test]
    fn test_c4_middle_c() {
        let freq = midi_note_to_frequency(60);
        assert!((freq - 261.63).abs() < 0.01); // Middle C
        assert_eq!(frequency_to_midi_note(261.63), 60);
    }

    #[test]
    fn test_unvoiced_frequency() {
        assert_eq!(frequency_to_midi_note(0.0), -1);
        assert_eq!(frequency_to_midi_note(-12.0), -1);
        assert_eq!(frequency_to_midi_note(f32::NAN), -1);
    }

    #[test]
    fn test_extreme_frequencies_clamp() {
        assert_eq!(frequency_to_midi_note(1.0), 0);
        assert_eq!(frequency_to_midi_note(40_000.0), 127);
    }

    #[test]
    fn test_out_of_range_note_frequency() {
        assert_eq!(midi_note_to_frequency(-1), 0.0);
        assert_eq!(midi_note_to_frequency(128), 0.0);
    }

    #[test]
    fn test_note_names() {
        assert_eq!(midi_note_to_note_name(69), "A4");
        assert_eq!(midi_note_to_note_name(60), "C4");
        assert_eq!(midi_note_to_note_name(61), "C#4");
        assert_eq!(midi_note_to_note_name(0), "C-1");
        assert_eq!(midi_note_to_note_name(127), "G9");
        assert_eq!(midi_note_to_note_name(-1), "N/A");
        assert_eq!(midi_note_to_note_name(128), "N/A");
    }

    #[test]
    fn test_cents() {
        assert_eq!(cents_between(60, 62), 200);
        assert_eq!(cents_between(62, 60), -200);
        assert!((cents_between_frequencies(440.0, 880.0) - 1200.0).abs() < 0.01);
        assert!((cents_between_frequencies(440.0, 466.16) - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_round_trip_vocal_range() {
        // 80 Hz to 1100 Hz in small steps
        let mut freq = 80.0_f32;
        while freq < 1100.0 {
            let note = frequency_to_midi_note(freq);
            let back = midi_note_to_frequency(note);
            assert!(
                cents_between_frequencies(freq, back).abs() <= 50.01,
                "{} Hz -> note {} -> {} Hz",
                freq,
                note,
                back
            );
            freq *= 1.013;
        }
    }
}
