//! Utterance endpoint detection.
//!
//! A hysteresis state machine over per-frame speech verdicts: two voting
//! windows with asymmetric thresholds decide where an utterance starts and
//! ends, a bounded pre-roll buffer preserves the audio just before the
//! confirmed onset, and a hard cap bounds how long a single utterance may
//! record.

pub mod detector;
pub mod preroll;
pub mod window;

pub use detector::{DetectorState, EndpointDetector};
pub use preroll::PreRollBuffer;
pub use window::VotingWindow;

use serde::{Deserialize, Serialize};

use crate::buffering::frame::FrameSpec;

/// Why an utterance was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloseReason {
    /// The end voting window confirmed sustained silence.
    Silence,
    /// The triggered-state duration cap elapsed. Not an error — a safety
    /// valve against runaway recordings when silence never accumulates.
    Timeout,
    /// An external cancellation forced the close; the partial audio is
    /// still emitted, never discarded.
    Cancelled,
}

/// A finished utterance: every sample between the detected start and end.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub samples: Vec<i16>,
    pub sample_rate_hz: u32,
    pub close: CloseReason,
}

impl Utterance {
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }

    /// `true` when every sample is zero (a valid, if useless, result).
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }
}

/// Emitted by [`EndpointDetector::advance`] at state transitions.
#[derive(Debug)]
pub enum EndpointEvent {
    /// Start-of-speech confirmed; an utterance is now accumulating.
    SpeechStart,
    /// End-of-speech confirmed; the trimmed utterance is handed off.
    SpeechEnd(Utterance),
}

/// Tuning for the endpoint state machine.
#[derive(Debug, Clone, Copy)]
pub struct EndpointConfig {
    pub frame: FrameSpec,
    /// Length of the start voting window in milliseconds. The end window is
    /// twice this long: end-of-speech needs a stronger confirmation than
    /// onset so mid-utterance pauses are not clipped.
    pub start_window_ms: u32,
    /// Trigger when the start window's voiced fraction strictly exceeds this.
    pub start_threshold: f32,
    /// Close when the end window's unvoiced fraction strictly exceeds this.
    pub end_threshold: f32,
    /// How much audio to retain ahead of the confirmed trigger.
    pub pre_roll_ms: u32,
    /// Frames of pre-trigger audio kept in the finished utterance; any
    /// earlier pre-roll is trimmed as leading silence.
    pub look_back_frames: usize,
    /// Hard cap on triggered-state duration.
    pub max_triggered_ms: u32,
}

impl EndpointConfig {
    pub fn start_window_frames(&self) -> usize {
        self.frame.frames_in_ms(self.start_window_ms).max(1)
    }

    pub fn end_window_frames(&self) -> usize {
        self.start_window_frames() * 2
    }

    pub fn pre_roll_frames(&self) -> usize {
        self.frame.frames_in_ms(self.pre_roll_ms).max(1)
    }

    pub fn max_triggered_frames(&self) -> usize {
        self.frame.frames_in_ms(self.max_triggered_ms)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            frame: FrameSpec::default(),
            start_window_ms: 400,
            start_threshold: 0.8,
            end_threshold: 0.9,
            pre_roll_ms: 1_500,
            look_back_frames: 20,
            max_triggered_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_geometry_at_30ms_frames() {
        let cfg = EndpointConfig::default();
        assert_eq!(cfg.start_window_frames(), 13);
        assert_eq!(cfg.end_window_frames(), 26);
        assert_eq!(cfg.pre_roll_frames(), 50);
        assert_eq!(cfg.max_triggered_frames(), 333);
    }

    #[test]
    fn silent_utterance_detection() {
        let silent = Utterance {
            samples: vec![0; 480],
            sample_rate_hz: 16_000,
            close: CloseReason::Silence,
        };
        assert!(silent.is_silent());
        let voiced = Utterance {
            samples: vec![0, 5, 0],
            sample_rate_hz: 16_000,
            close: CloseReason::Silence,
        };
        assert!(!voiced.is_silent());
    }
}
