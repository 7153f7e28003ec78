use std::ops::Index;

/// Fixed-capacity circular buffer of audio samples
/// Once full, each new sample overwrites the oldest one
/// Indexing is in logical order: index 0 is the oldest sample
pub struct RingSampleBuffer {
    samples: Vec<f32>,
    start: usize,
    count: usize,
}

impl RingSampleBuffer {
    /// Create an empty buffer holding at most `capacity` samples
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be > 0");
        Self {
            samples: vec![0.0; capacity],
            start: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// Number of valid samples, saturating at capacity
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Append a sample, overwriting the oldest once full
    pub fn add(&mut self, sample: f32) {
        let capacity = self.capacity();
        if self.count < capacity {
            self.samples[(self.start + self.count) % capacity] = sample;
            self.count += 1;
        } else {
            self.samples[self.start] = sample;
            self.start = (self.start + 1) % capacity;
        }
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> Iter<'_> {
        Iter { buffer: self, position: 0 }
    }

    /// Replace the contents of `out` with the samples in logical order
    pub fn copy_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.reserve(self.count);

        let capacity = self.capacity();
        let first = (capacity - self.start).min(self.count);
        out.extend_from_slice(&self.samples[self.start..self.start + first]);
        out.extend_from_slice(&self.samples[..self.count - first]);
    }

    pub fn clear(&mut self) {
        self.start = 0;
        self.count = 0;
    }
}

impl Index<usize> for RingSampleBuffer {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        if index >= self.count {
            panic!(
                "ring buffer index out of bounds: the len is {} but the index is {}",
                self.count, index
            );
        }
        &self.samples[(self.start + index) % self.capacity()]
    }
}

/// Oldest-to-newest iterator over a ring buffer
pub struct Iter<'a> {
    buffer: &'a RingSampleBuffer,
    position: usize,
}

impl Iterator for Iter<'_> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.buffer.len() {
            return None;
        }
        let sample = self.buffer[self.position];
        self.position += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a RingSampleBuffer {
    type Item = f32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Windows' worth of samples the capture queue holds before dropping
const QUEUE_WINDOWS: usize = 16;

/// Create the capture handoff for analysis windows of `window_capacity` samples
///
/// The producer half goes to the audio callback and never blocks; the
/// consumer half owns the ring buffer, so only the frame loop ever reads
/// or writes the window.
pub fn sample_queue(window_capacity: usize) -> (SampleProducer, SampleWindow) {
    let ring = RingSampleBuffer::new(window_capacity);
    let (producer, consumer) = rtrb::RingBuffer::<f32>::new(window_capacity * QUEUE_WINDOWS).split();
    (
        SampleProducer { producer, dropped: 0 },
        SampleWindow {
            consumer,
            ring,
            unread: 0,
        },
    )
}

/// Audio-thread side of the sample queue
pub struct SampleProducer {
    producer: rtrb::Producer<f32>,
    dropped: u64,
}

impl SampleProducer {
    /// Queue a block of samples without blocking
    /// Samples that do not fit are dropped; returns how many were
    pub fn push_samples(&mut self, samples: impl IntoIterator<Item = f32>) -> usize {
        let mut dropped = 0;
        for sample in samples {
            if self.producer.push(sample).is_err() {
                dropped += 1;
            }
        }
        self.dropped += dropped as u64;
        dropped
    }

    /// Samples dropped since creation
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Frame-loop side of the sample queue: the latest analysis window
pub struct SampleWindow {
    consumer: rtrb::Consumer<f32>,
    ring: RingSampleBuffer,
    /// Samples received since the last snapshot
    unread: usize,
}

impl SampleWindow {
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    fn drain(&mut self) {
        while let Ok(sample) = self.consumer.pop() {
            self.ring.add(sample);
            self.unread += 1;
        }
    }

    /// Copy a full window into `out`
    /// Returns false (leaving `out` untouched) if the buffer is not full yet
    /// or no new samples arrived since the previous snapshot
    pub fn snapshot(&mut self, out: &mut Vec<f32>) -> bool {
        self.drain();
        if !self.ring.is_full() || self.unread == 0 {
            return false;
        }
        self.ring.copy_into(out);
        self.unread = 0;
        true
    }

    /// Discard queued and buffered samples
    pub fn clear(&mut self) {
        while self.consumer.pop().is_ok() {}
        self.ring.clear();
        self.unread = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_fill() {
        let mut buffer = RingSampleBuffer::new(4);
        buffer.add(0.1);
        buffer.add(0.2);
        assert_eq!(buffer.len(), 2);
        assert!(!buffer.is_full());
        assert_eq!(buffer[0], 0.1);
        assert_eq!(buffer[1], 0.2);
    }

    #[test]
    fn test_overwrites_oldest() {
        let mut buffer = RingSampleBuffer::new(3);
        for i in 0..7 {
            buffer.add(i as f32);
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.capacity(), 3);
        assert_eq!(buffer[0], 4.0);
        assert_eq!(buffer[1], 5.0);
        assert_eq!(buffer[2], 6.0);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut buffer = RingSampleBuffer::new(3);
        for i in 0..5 {
            buffer.add(i as f32);
        }
        let first: Vec<f32> = buffer.iter().collect();
        let second: Vec<f32> = (&buffer).into_iter().collect();
        assert_eq!(first, vec![2.0, 3.0, 4.0]);
        assert_eq!(first, second);
        assert_eq!(buffer.iter().len(), 3);
    }

    #[test]
    fn test_copy_into_matches_iteration() {
        let mut buffer = RingSampleBuffer::new(5);
        for i in 0..12 {
            buffer.add(i as f32);
        }
        let mut out = vec![99.0; 2];
        buffer.copy_into(&mut out);
        assert_eq!(out, buffer.iter().collect::<Vec<_>>());

        let mut partial = RingSampleBuffer::new(5);
        partial.add(1.0);
        partial.add(2.0);
        partial.copy_into(&mut out);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_index_out_of_range_panics() {
        let mut buffer = RingSampleBuffer::new(4);
        buffer.add(1.0);
        let _ = buffer[1];
    }

    #[test]
    fn test_clear() {
        let mut buffer = RingSampleBuffer::new(2);
        buffer.add(1.0);
        buffer.add(2.0);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.iter().count(), 0);
    }

    #[test]
    fn test_snapshot_requires_full_buffer() {
        let (mut producer, mut window) = sample_queue(4);
        let mut out = Vec::new();

        producer.push_samples([0.1, 0.2, 0.3]);
        assert!(!window.snapshot(&mut out));
        assert!(out.is_empty());

        producer.push_samples([0.4, 0.5]);
        assert!(window.snapshot(&mut out));
        assert_eq!(out, vec![0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn test_snapshot_skips_stale_window() {
        let (mut producer, mut window) = sample_queue(2);
        let mut out = Vec::new();

        producer.push_samples([1.0, 2.0]);
        assert!(window.snapshot(&mut out));
        assert!(!window.snapshot(&mut out));

        producer.push_samples([3.0]);
        assert!(window.snapshot(&mut out));
        assert_eq!(out, vec![2.0, 3.0]);
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        // Queue holds 2 x 16 samples
        let (mut producer, mut window) = sample_queue(2);
        let dropped = producer.push_samples((0..40).map(|i| i as f32));
        assert_eq!(dropped, 8);
        assert_eq!(producer.dropped(), 8);

        let mut out = Vec::new();
        assert!(window.snapshot(&mut out));
        assert_eq!(out, vec![30.0, 31.0]);

        // Draining made room again
        assert_eq!(producer.push_samples([1.0, 2.0]), 0);
    }

    #[test]
    fn test_clear_discards_queued_samples() {
        let (mut producer, mut window) = sample_queue(2);
        producer.push_samples([1.0, 2.0, 3.0]);
        window.clear();

        let mut out = Vec::new();
        assert!(!window.snapshot(&mut out));
        producer.push_samples([4.0, 5.0]);
        assert!(window.snapshot(&mut out));
        assert_eq!(out, vec![4.0, 5.0]);
    }

    #[test]
    fn test_snapshot_across_threads() {
        let (mut producer, mut window) = sample_queue(64);

        let handle = std::thread::spawn(move || {
            for block in 0..20 {
                producer.push_samples((0..32).map(|i| (block * 32 + i) as f32));
            }
            producer.dropped()
        });
        assert_eq!(handle.join().unwrap(), 0);

        let mut out = Vec::new();
        assert!(window.snapshot(&mut out));
        assert_eq!(out.len(), 64);
        // Consecutive samples, newest last
        for pair in out.windows(2) {
            assert_eq!(pair[1] - pair[0], 1.0);
        }
        assert_eq!(out[63], 639.0);
    }
}
