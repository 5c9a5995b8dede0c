//! Energy-based frame classifier using an RMS threshold.
//!
//! The aggressiveness scale mirrors the 0–3 convention of WebRTC-style
//! detectors: higher values are more conservative about calling a frame
//! speech (higher RMS required).

use super::FrameClassifier;
use crate::buffering::frame::Frame;

/// RMS thresholds (normalized to [0, 1]) indexed by aggressiveness 0–3.
const THRESHOLDS: [f32; 4] = [0.010, 0.020, 0.035, 0.050];

/// A simple energy-based speech classifier.
#[derive(Debug, Clone)]
pub struct EnergyClassifier {
    /// Normalized RMS level above which a frame is considered speech.
    threshold: f32,
}

impl EnergyClassifier {
    /// Create a classifier from an aggressiveness level.
    ///
    /// Levels above 3 are clamped to 3.
    pub fn new(aggressiveness: u8) -> Self {
        let idx = (aggressiveness as usize).min(THRESHOLDS.len() - 1);
        Self {
            threshold: THRESHOLDS[idx],
        }
    }

    /// Create a classifier with an explicit RMS threshold.
    pub fn with_threshold(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Root-mean-square of an i16 slice, normalized to [0, 1].
    fn rms(samples: &[i16]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples
            .iter()
            .map(|&s| {
                let x = s as f64 / 32768.0;
                x * x
            })
            .sum();
        (sum_sq / samples.len() as f64).sqrt() as f32
    }
}

impl Default for EnergyClassifier {
    fn default() -> Self {
        Self::new(1)
    }
}

impl FrameClassifier for EnergyClassifier {
    fn classify(&mut self, frame: &Frame) -> bool {
        Self::rms(frame.samples()) >= self.threshold
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame_of(amplitude: i16, len: usize) -> Frame {
        Frame::new(vec![amplitude; len], 16_000)
    }

    #[test]
    fn silence_below_threshold() {
        let mut vad = EnergyClassifier::new(1);
        assert!(!vad.classify(&frame_of(0, 480)));
    }

    #[test]
    fn loud_frame_is_speech() {
        let mut vad = EnergyClassifier::new(1);
        assert!(vad.classify(&frame_of(16_000, 480)));
    }

    #[test]
    fn higher_aggressiveness_is_more_conservative() {
        // Amplitude chosen between the level-0 and level-3 thresholds.
        let quiet = frame_of(1_000, 480); // RMS ≈ 0.0305
        assert!(EnergyClassifier::new(0).classify(&quiet));
        assert!(!EnergyClassifier::new(3).classify(&quiet));
    }

    #[test]
    fn aggressiveness_clamps_at_three() {
        let mut high = EnergyClassifier::new(200);
        let mut three = EnergyClassifier::new(3);
        let frame = frame_of(1_200, 480);
        assert_eq!(high.classify(&frame), three.classify(&frame));
    }

    #[test]
    fn empty_frame_is_silence() {
        let mut vad = EnergyClassifier::default();
        assert!(!vad.classify(&Frame::new(vec![], 16_000)));
    }

    #[test]
    fn rms_of_square_wave() {
        // A ±16384 square wave has normalized RMS of 0.5.
        let samples: Vec<i16> = (0..256)
            .map(|i| if i % 2 == 0 { 16_384 } else { -16_384 })
            .collect();
        assert_relative_eq!(
            EnergyClassifier::rms(&samples),
            0.5,
            epsilon = 1e-5
        );
    }
}
