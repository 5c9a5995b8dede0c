//! Per-frame speech classification.
//!
//! The `FrameClassifier` trait is the primary extensibility point: the
//! endpoint detector only ever sees boolean verdicts, so any VAD backend
//! (energy threshold, WebRTC-style GMM, neural) can be swapped in without
//! touching the state machine.

pub mod energy;

pub use energy::EnergyClassifier;

use crate::buffering::frame::Frame;

/// Trait for all per-frame speech/non-speech classifiers.
///
/// Implementors may be stateful (hangover counters, hidden states, etc.).
pub trait FrameClassifier: Send + 'static {
    /// Return `true` when the frame is judged to contain speech.
    ///
    /// The frame's sample rate should match whatever rate this classifier
    /// was configured for. Resampling is the caller's responsibility.
    fn classify(&mut self, frame: &Frame) -> bool;

    /// Reset any internal state between listening sessions.
    fn reset(&mut self);
}
