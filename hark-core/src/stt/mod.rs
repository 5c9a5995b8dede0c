//! Speech-to-text backend abstraction.
//!
//! The `Transcriber` trait decouples the session loop from any specific
//! engine. Two independently configured instances are used: one while
//! listening passively for a wake phrase, one for active (prompted) listening.
//!
//! `&mut self` on `transcribe` intentionally expresses that decoders are
//! stateful — beam search caches, hidden states, etc. All mutation is
//! serialised through `TranscriberHandle`'s `parking_lot::Mutex`.

pub mod stub;

pub use stub::StubTranscriber;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Contract for speech recognition backends.
///
/// Input is a complete mono 16-bit PCM WAV byte buffer (see
/// [`crate::audio::wav::encode_wav`]).
pub trait Transcriber: Send + 'static {
    /// Transcribe one utterance, returning candidate strings in decreasing
    /// confidence order. An empty list means "no match" — the session layer
    /// never retries here.
    fn transcribe(&mut self, wav: &[u8]) -> Result<Vec<String>>;
}

/// Thread-safe reference-counted handle to any `Transcriber` implementor.
///
/// `parking_lot::Mutex` for non-poisoning on panic and a faster uncontended
/// path than `std::sync::Mutex`.
#[derive(Clone)]
pub struct TranscriberHandle(pub Arc<Mutex<dyn Transcriber>>);

impl TranscriberHandle {
    pub fn new<T: Transcriber>(engine: T) -> Self {
        Self(Arc::new(Mutex::new(engine)))
    }
}

impl std::fmt::Debug for TranscriberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriberHandle").finish_non_exhaustive()
    }
}
