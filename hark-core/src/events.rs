//! Event types broadcast by the listener service.
//!
//! Wire casing is camelCase so frontends and log shippers can consume the
//! JSON without field mapping.

use serde::{Deserialize, Serialize};

use crate::endpoint::CloseReason;

/// Emitted once per finished utterance in passive listening.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtteranceEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Transcription candidates in decreasing confidence order; empty means
    /// no match (backend failure or nothing recognisable).
    pub candidates: Vec<String>,
    /// Why the endpoint detector closed the utterance.
    pub close: CloseReason,
    /// Whether any candidate contained the configured wake phrase.
    pub wake_match: bool,
}

/// Emitted when the listener service changes state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerStatusEvent {
    pub status: ListenerStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Current state of the listener service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerStatus {
    /// Service created but `start()` not yet called.
    Idle,
    /// Actively capturing audio and segmenting utterances.
    Listening,
    /// Capture stopped; the service may be restarted.
    Stopped,
    /// Capture failed — restart required.
    Error,
}
