use std::collections::{BTreeMap, VecDeque};

use crate::types::note::cents_between_frequencies;

/// Pitch changes smaller than this (in cents) are held at the last stable pitch
pub const HYSTERESIS_CENTS: f32 = 30.0;

/// Bounded FIFO: pushing past capacity evicts the oldest value
#[derive(Debug, Clone)]
pub struct History<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T> History<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.values.iter()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Stage 1: running median over the last few raw pitches
/// Rejects single-frame outliers that a moving average would smear in
pub struct MedianSmoother {
    window: History<f32>,
    scratch: Vec<f32>,
}

impl MedianSmoother {
    pub fn new(size: usize) -> Self {
        Self {
            window: History::new(size),
            scratch: Vec::with_capacity(size),
        }
    }

    /// Push a raw pitch and return the median of the window
    pub fn process(&mut self, raw_pitch: f32) -> f32 {
        self.window.push(raw_pitch);
        self.scratch.clear();
        self.scratch.extend(self.window.iter().copied());
        median(&mut self.scratch)
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

/// Median of a non-empty slice; mean of the two middle values for even lengths
pub fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Stage 2 result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hysteresis {
    /// Change too small: the last stable pitch is kept
    Held(f32),
    /// Change large enough (or nothing stable yet): the smoothed pitch is taken
    Moved(f32),
}

impl Hysteresis {
    pub fn pitch(self) -> f32 {
        match self {
            Hysteresis::Held(pitch) | Hysteresis::Moved(pitch) => pitch,
        }
    }
}

/// Stage 2: ignore movements under `HYSTERESIS_CENTS` around the last stable pitch
pub fn apply_hysteresis(smoothed: f32, last_stable_pitch: f32) -> Hysteresis {
    if last_stable_pitch > 0.0
        && cents_between_frequencies(last_stable_pitch, smoothed).abs() < HYSTERESIS_CENTS
    {
        Hysteresis::Held(last_stable_pitch)
    } else {
        Hysteresis::Moved(smoothed)
    }
}

/// Stage 3 result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    /// Note chosen for this frame
    pub note: i32,
    /// Occurrences of the most frequent note in the history
    pub count: usize,
    /// Whether the most frequent note won the vote
    pub majority: bool,
}

/// Stage 3: majority vote over recent candidate notes
pub struct MajorityVote {
    history: History<i32>,
}

impl MajorityVote {
    pub fn new(size: usize) -> Self {
        Self {
            history: History::new(size),
        }
    }

    /// Record `candidate` and vote
    /// The mode wins when it fills at least half the history; ties go to
    /// the lowest note
    pub fn vote(&mut self, candidate: i32) -> VoteOutcome {
        self.history.push(candidate);

        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for &note in self.history.iter() {
            *counts.entry(note).or_insert(0) += 1;
        }

        // Ascending key order with a strict comparison keeps the lowest note on ties
        let (mode, count) = counts
            .into_iter()
            .fold((candidate, 0), |best, (note, count)| {
                if count > best.1 { (note, count) } else { best }
            });

        let required = self.history.len().div_ceil(2);
        if count >= required {
            VoteOutcome { note: mode, count, majority: true }
        } else {
            VoteOutcome { note: candidate, count, majority: false }
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

/// Stage 4 measurement over the pitch history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    pub mean: f32,
    pub max_deviation: f32,
}

impl Spread {
    /// Mean and maximum absolute deviation from it; None for an empty history
    pub fn of(history: &History<f32>) -> Option<Self> {
        if history.is_empty() {
            return None;
        }
        let mean = history.iter().sum::<f32>() / history.len() as f32;
        let max_deviation = history
            .iter()
            .map(|pitch| (pitch - mean).abs())
            .fold(0.0, f32::max);
        Some(Self { mean, max_deviation })
    }
}
