use crate::types::events::{FrameEvents, NoteEvent};

/// Candidate note value meaning "no note this frame"
pub const SILENT_NOTE: u8 = 0;

/// Whether a note is currently sounding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteState {
    Silent,
    Sounding(u8),
}

/// Monophonic note on/off decisions, one call per frame
///
/// Sits on top of the pitch stabilizer as a second, coarser debounce: a
/// different note must be seen for `min_stable_frames` consecutive frames
/// before the sounding note changes.
pub struct NoteEventController {
    channel: u8,
    min_stable_frames: usize,
    silence_threshold: u8,
    active_note: Option<u8>,
    last_candidate: Option<u8>,
    candidate_run_length: usize,
}

impl NoteEventController {
    /// `channel` is 0-15
    pub fn new(channel: u8, min_stable_frames: usize, silence_threshold: u8) -> Self {
        Self {
            channel: channel.min(15),
            min_stable_frames,
            silence_threshold,
            active_note: None,
            last_candidate: None,
            candidate_run_length: 0,
        }
    }

    pub fn state(&self) -> NoteState {
        match self.active_note {
            Some(note) => NoteState::Sounding(note),
            None => NoteState::Silent,
        }
    }

    pub fn active_note(&self) -> Option<u8> {
        self.active_note
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Decide this frame's events from the candidate note and loudness (0-127)
    pub fn process(&mut self, candidate_note: u8, loudness: u8) -> FrameEvents {
        if candidate_note == SILENT_NOTE || loudness < self.silence_threshold {
            self.last_candidate = None;
            self.candidate_run_length = 0;
            return FrameEvents {
                note_off: self.take_active(loudness),
                note_on: None,
            };
        }

        if Some(candidate_note) == self.active_note {
            // Interrupted candidates start over
            self.last_candidate = Some(candidate_note);
            self.candidate_run_length = 0;
            return FrameEvents::none();
        }

        if Some(candidate_note) != self.last_candidate {
            self.last_candidate = Some(candidate_note);
            self.candidate_run_length = 0;
            return FrameEvents::none();
        }

        self.candidate_run_length += 1;
        if self.candidate_run_length < self.min_stable_frames {
            return FrameEvents::none();
        }
        self.candidate_run_length = 0;

        let note_off = self.take_active(loudness);
        self.active_note = Some(candidate_note);
        log::debug!("note on {} (velocity {})", candidate_note, loudness);

        FrameEvents {
            note_off,
            note_on: Some(NoteEvent::note_on(self.channel, candidate_note, loudness)),
        }
    }

    /// Force the silent state, returning the note off for a sounding note
    pub fn release(&mut self) -> Option<NoteEvent> {
        self.last_candidate = None;
        self.candidate_run_length = 0;
        self.take_active(0)
    }

    fn take_active(&mut self, velocity: u8) -> Option<NoteEvent> {
        let note = self.active_note.take()?;
        log::debug!("note off {} (velocity {})", note, velocity);
        Some(NoteEvent::note_off(self.channel, note, velocity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN_FRAMES: usize = 15;
    const THRESHOLD: u8 = 10;
    const LOUD: u8 = 90;

    fn controller() -> NoteEventController {
        NoteEventController::new(0, MIN_FRAMES, THRESHOLD)
    }

    /// Feed the same candidate for `frames` frames and collect every event
    fn feed(controller: &mut NoteEventController, note: u8, loudness: u8, frames: usize) -> Vec<NoteEvent> {
        (0..frames)
            .flat_map(|_| controller.process(note, loudness).iter().collect::<Vec<_>>())
            .collect()
    }

    /// Bring the controller to Sounding(note)
    fn sound(controller: &mut NoteEventController, note: u8) {
        let events = feed(controller, note, LOUD, MIN_FRAMES + 1);
        assert_eq!(events, vec![NoteEvent::note_on(0, note, LOUD)]);
    }

    #[test]
    fn test_initial_state_is_silent() {
        let controller = controller();
        assert_eq!(controller.state(), NoteState::Silent);
        assert_eq!(controller.active_note(), None);
    }

    #[test]
    fn test_note_on_after_debounce() {
        let mut controller = controller();
        // First sighting records the candidate, then MIN_FRAMES more are needed
        for _ in 0..MIN_FRAMES {
            assert!(controller.process(60, LOUD).is_empty());
        }
        let events = controller.process(60, LOUD);
        assert_eq!(events.note_off, None);
        assert_eq!(events.note_on, Some(NoteEvent::note_on(0, 60, LOUD)));
        assert_eq!(controller.state(), NoteState::Sounding(60));
    }

    #[test]
    fn test_steady_note_emits_nothing() {
        let mut controller = controller();
        sound(&mut controller, 60);
        assert!(feed(&mut controller, 60, LOUD, 100).is_empty());
        assert_eq!(controller.active_note(), Some(60));
    }

    #[test]
    fn test_silence_releases_note_once() {
        let mut controller = controller();
        sound(&mut controller, 60);

        let events = controller.process(60, 3);
        assert_eq!(events.note_on, None);
        assert_eq!(events.note_off, Some(NoteEvent::note_off(0, 60, 3)));
        assert_eq!(controller.state(), NoteState::Silent);

        assert!(feed(&mut controller, 60, 3, 10).is_empty());
    }

    #[test]
    fn test_silent_note_releases() {
        let mut controller = controller();
        sound(&mut controller, 64);

        let events: Vec<NoteEvent> = controller.process(SILENT_NOTE, LOUD).iter().collect();
        assert_eq!(events, vec![NoteEvent::note_off(0, 64, LOUD)]);
        assert_eq!(controller.active_note(), None);
    }

    #[test]
    fn test_short_change_is_suppressed() {
        let mut controller = controller();
        sound(&mut controller, 60);

        assert!(feed(&mut controller, 62, LOUD, MIN_FRAMES).is_empty());
        assert!(feed(&mut controller, 60, LOUD, 5).is_empty());
        // The interrupted run does not carry over
        assert!(feed(&mut controller, 62, LOUD, MIN_FRAMES).is_empty());
        assert_eq!(controller.active_note(), Some(60));
    }

    #[test]
    fn test_alternating_candidates_never_change() {
        let mut controller = controller();
        sound(&mut controller, 60);

        for frame in 0..200 {
            let note = if frame % 3 == 0 { 62 } else { 63 };
            assert!(controller.process(note, LOUD).is_empty());
        }
        assert_eq!(controller.active_note(), Some(60));
    }

    #[test]
    fn test_persistent_change_emits_off_then_on() {
        let mut controller = controller();
        sound(&mut controller, 60);

        for _ in 0..MIN_FRAMES {
            assert!(controller.process(67, 80).is_empty());
        }
        let events = controller.process(67, 80);
        let ordered: Vec<NoteEvent> = events.iter().collect();
        assert_eq!(
            ordered,
            vec![NoteEvent::note_off(0, 60, 80), NoteEvent::note_on(0, 67, 80)]
        );
        assert_eq!(controller.state(), NoteState::Sounding(67));

        // Exactly one transition
        assert!(feed(&mut controller, 67, 80, 50).is_empty());
    }

    #[test]
    fn test_release() {
        let mut controller = controller();
        assert_eq!(controller.release(), None);

        sound(&mut controller, 72);
        assert_eq!(controller.release(), Some(NoteEvent::note_off(0, 72, 0)));
        assert_eq!(controller.state(), NoteState::Silent);
        assert_eq!(controller.release(), None);
    }

    #[test]
    fn test_events_carry_channel() {
        let mut controller = NoteEventController::new(9, 1, THRESHOLD);
        controller.process(50, LOUD);
        let events = controller.process(50, LOUD);
        assert_eq!(events.note_on.map(|e| e.channel()), Some(9));
    }
}
