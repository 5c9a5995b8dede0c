//! # hark-core
//!
//! Streaming utterance endpointing engine: segments continuous microphone
//! audio into discrete spoken utterances and hands each one to a
//! speech-to-text backend.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → MicStream (SPSC ring + resample) → FrameClassifier verdict
//!                                                       │
//!                                              EndpointDetector
//!                                         (voting windows + pre-roll)
//!                                                       │
//!                                    normalize → WAV → Transcriber
//! ```
//!
//! The audio callback is zero-alloc. All heap work happens on the blocking
//! session thread, which processes frames strictly in arrival order.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod session;
pub mod stt;
pub mod vad;

// Convenience re-exports for downstream crates
pub use buffering::frame::{Frame, FrameSpec, CANONICAL_SAMPLE_RATE_HZ};
pub use endpoint::{CloseReason, EndpointConfig, EndpointDetector, Utterance};
pub use error::HarkError;
pub use events::{ListenerStatus, ListenerStatusEvent, UtteranceEvent};
pub use session::{
    service::ListenerService, CancelToken, HeardUtterance, ListenMode, Listener, ListenerConfig,
};
pub use stt::{StubTranscriber, Transcriber, TranscriberHandle};
pub use vad::{EnergyClassifier, FrameClassifier};

pub use audio::MicCapture;
