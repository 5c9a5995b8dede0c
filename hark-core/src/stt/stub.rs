//! `StubTranscriber` — placeholder backend that echoes metadata without a
//! real model. Lets the full listen → endpoint → handoff path be exercised
//! end-to-end in development and tests.

use std::io::Cursor;

use tracing::debug;

use crate::error::Result;
use crate::stt::Transcriber;

/// Echo-style stub engine.
///
/// For every utterance it returns a single candidate of the form
/// `"[stub: <N> samples @ <SR> Hz]"`, parsed from the WAV header.
pub struct StubTranscriber {
    utterance_count: u32,
}

impl StubTranscriber {
    pub fn new() -> Self {
        Self { utterance_count: 0 }
    }
}

impl Default for StubTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcriber for StubTranscriber {
    fn transcribe(&mut self, wav: &[u8]) -> Result<Vec<String>> {
        let reader = match hound::WavReader::new(Cursor::new(wav)) {
            Ok(r) => r,
            Err(e) => {
                debug!("stub transcriber got an unreadable buffer: {e}");
                return Ok(vec![]);
            }
        };
        let spec = reader.spec();
        let frames = reader.duration();
        if frames == 0 {
            return Ok(vec![]);
        }

        self.utterance_count += 1;
        Ok(vec![format!(
            "[stub: {} samples @ {} Hz]",
            frames, spec.sample_rate
        )])
    }
}
