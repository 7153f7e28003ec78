/// Mean-square level below which a window is treated as silence
const ENERGY_FLOOR: f32 = 1e-6;

/// Peaks within this fraction of the highest peak are candidates; the
/// earliest one wins, which avoids picking a sub-harmonic
const PEAK_TOLERANCE: f32 = 0.9;

/// Time-domain autocorrelation pitch estimator
/// Returns one frequency per window, or 0.0 when the window is unvoiced
pub struct PitchEstimator {
    sample_rate: f32,
    min_lag: usize,
    max_lag: usize,
    clarity_threshold: f32,
    centered: Vec<f32>,
    correlation: Vec<f32>,
}

impl PitchEstimator {
    pub fn new(
        sample_rate: u32,
        min_frequency: f32,
        max_frequency: f32,
        clarity_threshold: f32,
    ) -> Self {
        let sample_rate = sample_rate as f32;

        // f0 = sr / lag
        let min_lag = (sample_rate / max_frequency).floor().max(2.0) as usize;
        let max_lag = (sample_rate / min_frequency).ceil() as usize;

        Self {
            sample_rate,
            min_lag,
            max_lag: max_lag.max(min_lag + 1),
            clarity_threshold,
            centered: Vec::new(),
            correlation: Vec::new(),
        }
    }

    /// Estimate the fundamental frequency of `window` in Hz (0.0 = no pitch)
    pub fn estimate(&mut self, window: &[f32]) -> f32 {
        let len = window.len();
        // Need at least two periods of the lowest frequency in the window
        let max_lag = self.max_lag.min(len / 2);
        if max_lag <= self.min_lag + 1 {
            return 0.0;
        }

        // Remove DC before correlating
        let mean = window.iter().sum::<f32>() / len as f32;
        self.centered.clear();
        self.centered.extend(window.iter().map(|s| s - mean));

        let energy: f32 = self.centered.iter().map(|x| x * x).sum();
        if !(energy > ENERGY_FLOOR * len as f32) {
            return 0.0;
        }

        // Normalized autocorrelation r[lag] / r[0], one extra lag for interpolation
        self.correlation.clear();
        for lag in 0..=max_lag + 1 {
            let r: f32 = self.centered[..len - lag]
                .iter()
                .zip(&self.centered[lag..])
                .map(|(a, b)| a * b)
                .sum();
            self.correlation.push(r / energy);
        }

        let Some(lag) = self.pick_peak(max_lag) else {
            return 0.0;
        };
        if self.correlation[lag] < self.clarity_threshold {
            return 0.0;
        }

        // Parabolic interpolation around the chosen lag
        let left = self.correlation[lag - 1];
        let center = self.correlation[lag];
        let right = self.correlation[lag + 1];
        let denominator = left - 2.0 * center + right;
        let offset = if denominator.abs() > f32::EPSILON {
            (0.5 * (left - right) / denominator).clamp(-0.5, 0.5)
        } else {
            0.0
        };

        self.sample_rate / (lag as f32 + offset)
    }

    /// First local maximum after the first zero crossing that is close to
    /// the highest peak in range
    fn pick_peak(&self, max_lag: usize) -> Option<usize> {
        let r = &self.correlation;

        let zero_crossing = (1..=max_lag).find(|&lag| r[lag] < 0.0)?;
        let start = zero_crossing.max(self.min_lag).max(1);

        let peaks: Vec<usize> = (start..=max_lag)
            .filter(|&lag| r[lag] > r[lag - 1] && r[lag] >= r[lag + 1])
            .collect();

        let highest = peaks.iter().map(|&lag| r[lag]).fold(f32::MIN, f32::max);
        peaks
            .into_iter()
            .find(|&lag| r[lag] >= PEAK_TOLERANCE * highest)
    }
}
