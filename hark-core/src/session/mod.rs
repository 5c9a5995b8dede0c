//! The listening session loop.
//!
//! Single-threaded, synchronous, frame-by-frame: block on the capture
//! stream for the next frame, classify it, feed the endpoint detector, and
//! only then consider the next frame. Frames are processed strictly in
//! arrival order — out-of-order frames would corrupt voting-window
//! semantics.
//!
//! The only cross-thread concern is cancellation: a [`CancelToken`] holds
//! two atomically-set flags polled once per frame. Single writer, single
//! reader, no locks; at most one extra frame is processed after a request.

pub mod service;

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::{debug, info, warn};

use crate::{
    audio::{
        cue::{CuePlayer, NullCue},
        normalize::normalize_peak,
        wav::encode_wav,
        CaptureSource,
    },
    endpoint::{
        CloseReason, DetectorState, EndpointConfig, EndpointDetector, EndpointEvent, Utterance,
    },
    error::Result,
    stt::TranscriberHandle,
    vad::FrameClassifier,
};

/// Externally raised cancellation signal, polled at frame boundaries.
///
/// Replaces process-wide signal flags with an explicit token so the
/// contract is testable without real OS signals.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Flags>,
}

#[derive(Default)]
struct Flags {
    /// "Stop after this utterance" — ends the session at the next boundary.
    stop: AtomicBool,
    /// "Treat the current utterance as already finished" — forces an
    /// immediate close of an in-progress utterance.
    finish: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt semantics: stop the session and flush whatever is in
    /// progress. Sets both flags.
    pub fn cancel(&self) {
        self.inner.finish.store(true, Ordering::Release);
        self.inner.stop.store(true, Ordering::Release);
    }

    /// Close the current utterance without ending the session.
    pub fn finish_current(&self) {
        self.inner.finish.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.inner.stop.load(Ordering::Acquire)
    }

    /// Consume a pending finish request, if any.
    pub fn take_finish_request(&self) -> bool {
        self.inner.finish.swap(false, Ordering::AcqRel)
    }

    /// Re-arm the token for a new session.
    pub fn clear(&self) {
        self.inner.stop.store(false, Ordering::Release);
        self.inner.finish.store(false, Ordering::Release);
    }
}

/// Passive runs until cancelled; active runs one cycle under a hard timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    Passive,
    Active,
}

/// Tuning for a [`Listener`].
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub endpoint: EndpointConfig,
    /// Phrase checked against passive transcription candidates.
    pub wake_phrase: String,
    /// Overall active-listen timeout; listening gives up if nothing
    /// triggered before it elapses.
    pub active_timeout_ms: u32,
    /// Peak level finished utterances are normalized to.
    pub target_peak: i16,
    /// Cue played before active listening, if any.
    pub cue_hi: Option<PathBuf>,
    /// Cue played after active listening, if any.
    pub cue_lo: Option<PathBuf>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            wake_phrase: String::new(),
            active_timeout_ms: 12_000,
            target_peak: i16::MAX,
            cue_hi: None,
            cue_lo: None,
        }
    }
}

/// One finished, transcribed utterance from a passive cycle.
#[derive(Debug, Clone)]
pub struct HeardUtterance {
    pub candidates: Vec<String>,
    pub close: CloseReason,
    /// Whether any candidate contained the configured wake phrase.
    pub wake_match: bool,
}

/// Drives repeated Idle → Triggered → Idle endpointing cycles over a
/// capture source and hands each finished utterance to a transcriber.
pub struct Listener {
    config: ListenerConfig,
    source: Box<dyn CaptureSource>,
    classifier: Box<dyn FrameClassifier>,
    passive_stt: TranscriberHandle,
    active_stt: TranscriberHandle,
    cue: Box<dyn CuePlayer>,
    token: CancelToken,
}

impl Listener {
    pub fn new(
        config: ListenerConfig,
        source: Box<dyn CaptureSource>,
        classifier: Box<dyn FrameClassifier>,
        passive_stt: TranscriberHandle,
        active_stt: TranscriberHandle,
    ) -> Self {
        Self {
            config,
            source,
            classifier,
            passive_stt,
            active_stt,
            cue: Box::new(NullCue),
            token: CancelToken::new(),
        }
    }

    /// Replace the default no-op cue player.
    pub fn with_cue_player(mut self, cue: Box<dyn CuePlayer>) -> Self {
        self.cue = cue;
        self
    }

    /// Use an externally created cancellation token (e.g. one already wired
    /// to a signal handler).
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.token = token;
        self
    }

    /// A clone of this listener's cancellation token, for wiring to signal
    /// handlers or a service controller.
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Run one Idle → Triggered → Idle cycle.
    ///
    /// Returns `None` when cancelled before any trigger, or (active mode)
    /// when the overall timeout elapses while still idle. A cancellation
    /// mid-utterance flushes and returns the partial utterance — user
    /// speech is never silently dropped because of an interrupt race.
    ///
    /// The capture stream is opened at entry and released on every exit
    /// path when the boxed stream drops.
    pub fn listen_once(&mut self, mode: ListenMode) -> Result<Option<Utterance>> {
        let spec = self.config.endpoint.frame;
        let timeout_frames = spec.frames_in_ms(self.config.active_timeout_ms);

        let mut stream = self.source.open(&spec)?;
        let mut detector = EndpointDetector::new(self.config.endpoint);
        self.classifier.reset();

        debug!(?mode, "listening cycle started");
        let mut frames_read = 0usize;

        loop {
            // Frame-boundary cancellation checks.
            if self.token.stop_requested() {
                info!("stop requested — ending listen cycle");
                return Ok(detector.force_close());
            }
            if self.token.take_finish_request() {
                if let Some(utterance) = detector.force_close() {
                    info!("finish requested — flushing in-progress utterance");
                    return Ok(Some(utterance));
                }
            }
            if mode == ListenMode::Active
                && detector.state() == DetectorState::Idle
                && frames_read >= timeout_frames
            {
                info!(frames_read, "active listen timed out before any trigger");
                return Ok(None);
            }

            let frame = stream.read_frame()?;
            frames_read += 1;

            let voiced = self.classifier.classify(&frame);
            if let Some(EndpointEvent::SpeechEnd(utterance)) = detector.advance(frame, voiced) {
                return Ok(Some(utterance));
            }
        }
    }

    /// One passive cycle: wait for an utterance, transcribe it with the
    /// passive engine, and check candidates for the wake phrase.
    ///
    /// Returns `None` when the cycle ended without any utterance.
    pub fn passive_listen(&mut self) -> Result<Option<HeardUtterance>> {
        let Some(utterance) = self.listen_once(ListenMode::Passive)? else {
            return Ok(None);
        };
        let close = utterance.close;
        let candidates = self.hand_off(utterance, ListenMode::Passive)?;
        let wake_match = !self.config.wake_phrase.is_empty()
            && candidates
                .iter()
                .any(|c| c.contains(&self.config.wake_phrase));
        Ok(Some(HeardUtterance {
            candidates,
            close,
            wake_match,
        }))
    }

    /// One active (prompted) cycle, bracketed by audible cues: record until
    /// silence or timeout and return the best transcription candidate.
    pub fn active_listen(&mut self) -> Result<Option<String>> {
        if let Some(ref path) = self.config.cue_hi {
            self.cue.play(path);
        }
        let heard = self.listen_once(ListenMode::Active)?;
        if let Some(ref path) = self.config.cue_lo {
            self.cue.play(path);
        }

        let Some(utterance) = heard else {
            return Ok(None);
        };
        let mut candidates = self.hand_off(utterance, ListenMode::Active)?;
        if candidates.is_empty() {
            Ok(None)
        } else {
            Ok(Some(candidates.remove(0)))
        }
    }

    /// Normalize, wrap as WAV, and transcribe one finished utterance.
    ///
    /// A backend failure is surfaced as "no candidates", not an error —
    /// retry policy, if any, belongs to the caller.
    fn hand_off(&mut self, utterance: Utterance, mode: ListenMode) -> Result<Vec<String>> {
        let mut samples = utterance.samples;
        normalize_peak(&mut samples, self.config.target_peak);
        let wav = encode_wav(&samples, utterance.sample_rate_hz)?;

        debug!(
            samples = samples.len(),
            close = ?utterance.close,
            ?mode,
            "handing utterance to transcription"
        );

        let handle = match mode {
            ListenMode::Passive => &self.passive_stt,
            ListenMode::Active => &self.active_stt,
        };
        match handle.0.lock().transcribe(&wav) {
            Ok(candidates) => Ok(candidates),
            Err(e) => {
                warn!("transcription failed, treating as no match: {e}");
                Ok(Vec::new())
            }
        }
    }
}
