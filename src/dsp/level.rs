/// Root-mean-square level of a window
pub fn rms(window: &[f32]) -> f32 {
    if window.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = window.iter().map(|s| s * s).sum();
    (sum_squares / window.len() as f32).sqrt()
}

/// Scale an RMS level to a MIDI velocity (0-127)
pub fn rms_to_velocity(rms: f32, gain: f32) -> u8 {
    (rms * gain).round().clamp(0.0, 127.0) as u8
}
