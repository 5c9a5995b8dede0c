//! The endpointing state machine.
//!
//! ## Transitions
//!
//! ```text
//! Idle ──voiced_fraction > start_threshold──► Triggered
//!   ▲                                            │
//!   └──unvoiced_fraction > end_threshold─────────┘
//!        or triggered duration > cap
//!        or force_close()
//! ```
//!
//! While Idle every frame lands in the pre-roll ring; on the trigger the
//! pre-roll (trigger frame included) seeds the utterance, so the audio that
//! accumulated before confirmation is not lost. While Triggered every frame
//! is appended verbatim — unvoiced frames too, since mid-utterance pauses
//! belong to the utterance.

use tracing::{debug, info};

use super::{
    CloseReason, EndpointConfig, EndpointEvent, PreRollBuffer, Utterance, VotingWindow,
};
use crate::buffering::frame::Frame;

/// Detector phase. At most one utterance is under construction at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Triggered,
}

pub struct EndpointDetector {
    config: EndpointConfig,
    state: DetectorState,
    start_window: VotingWindow,
    end_window: VotingWindow,
    pre_roll: PreRollBuffer,
    /// Raw samples of the in-progress utterance; empty while Idle.
    utterance: Vec<i16>,
    /// Sample count seeded from the pre-roll; meaningful only while Triggered.
    seeded_samples: usize,
    /// Frames consumed since the trigger; meaningful only while Triggered.
    frames_triggered: usize,
}

impl EndpointDetector {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            state: DetectorState::Idle,
            start_window: VotingWindow::new(config.start_window_frames()),
            end_window: VotingWindow::new(config.end_window_frames()),
            pre_roll: PreRollBuffer::new(config.pre_roll_frames()),
            utterance: Vec::new(),
            seeded_samples: 0,
            frames_triggered: 0,
            config,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Feed one classified frame, in arrival order.
    ///
    /// Returns an event on a state transition, `None` otherwise. Idle time is
    /// unbounded — only the Triggered phase is capped.
    pub fn advance(&mut self, frame: Frame, voiced: bool) -> Option<EndpointEvent> {
        match self.state {
            DetectorState::Idle => {
                self.pre_roll.push(frame);
                self.start_window.insert(voiced);

                if self.start_window.voiced_fraction() > self.config.start_threshold {
                    self.trigger();
                    Some(EndpointEvent::SpeechStart)
                } else {
                    None
                }
            }
            DetectorState::Triggered => {
                self.utterance.extend_from_slice(frame.samples());
                self.end_window.insert(voiced);
                self.frames_triggered += 1;

                if self.end_window.unvoiced_fraction() > self.config.end_threshold {
                    return Some(EndpointEvent::SpeechEnd(self.close(CloseReason::Silence)));
                }
                if self.frames_triggered > self.config.max_triggered_frames() {
                    info!(
                        frames = self.frames_triggered,
                        cap_ms = self.config.max_triggered_ms,
                        "triggered duration cap reached — closing utterance"
                    );
                    return Some(EndpointEvent::SpeechEnd(self.close(CloseReason::Timeout)));
                }
                None
            }
        }
    }

    /// Immediately close any in-progress utterance.
    ///
    /// Used at frame-boundary cancellation checks: whatever has accumulated
    /// is emitted (even if short) rather than discarded, so an interrupt race
    /// never silently drops user speech. Returns `None` while Idle.
    pub fn force_close(&mut self) -> Option<Utterance> {
        match self.state {
            DetectorState::Idle => None,
            DetectorState::Triggered => Some(self.close(CloseReason::Cancelled)),
        }
    }

    /// Return to a pristine Idle state, discarding all buffered audio.
    pub fn reset(&mut self) {
        self.state = DetectorState::Idle;
        self.start_window.fill(false);
        self.end_window.fill(false);
        self.pre_roll.clear();
        self.utterance.clear();
        self.seeded_samples = 0;
        self.frames_triggered = 0;
    }

    fn trigger(&mut self) {
        debug!(
            pre_roll_frames = self.pre_roll.len(),
            "start of speech confirmed"
        );
        self.state = DetectorState::Triggered;
        self.frames_triggered = 0;

        // Seed with everything buffered ahead of the trigger, trigger frame
        // included, then start both windows fresh: the start window must not
        // re-trigger from stale votes, and the end window begins fully voiced
        // so silence has to genuinely accumulate before a close.
        let seed = self.pre_roll.drain();
        self.seeded_samples = seed.iter().map(Frame::len).sum();
        self.utterance.clear();
        for frame in seed {
            self.utterance.extend_from_slice(frame.samples());
        }
        self.start_window.fill(false);
        self.end_window.fill(true);
    }

    fn close(&mut self, reason: CloseReason) -> Utterance {
        self.state = DetectorState::Idle;

        // Keep at most `look_back_frames` of pre-trigger audio; the earliest
        // pre-roll margin is leading silence, not pre-speech audio.
        let look_back_samples =
            self.config.look_back_frames * self.config.frame.samples_per_frame();
        let trim = self.seeded_samples.saturating_sub(look_back_samples);
        let samples = self.utterance.split_off(trim.min(self.utterance.len()));

        self.utterance.clear();
        self.seeded_samples = 0;
        self.frames_triggered = 0;
        self.start_window.fill(false);

        info!(
            samples = samples.len(),
            trimmed = trim,
            ?reason,
            "end of speech — utterance closed"
        );

        Utterance {
            samples,
            sample_rate_hz: self.config.frame.sample_rate_hz,
            close: reason,
        }
    }
}
