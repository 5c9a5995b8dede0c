//! In-memory WAV encoding for the transcription handoff.
//!
//! The buffer is transient: it exists only to carry one utterance into a
//! `Transcriber` call and is never persisted.

use std::io::Cursor;

use crate::error::{HarkError, Result};

/// Encode mono 16-bit signed little-endian PCM into an uncompressed
/// RIFF/WAVE byte buffer.
pub fn encode_wav(samples: &[i16], sample_rate_hz: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate_hz,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| HarkError::Other(anyhow::anyhow!("wav writer: {e}")))?;
        let mut i16_writer = writer.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            i16_writer.write_sample(sample);
        }
        i16_writer
            .flush()
            .map_err(|e| HarkError::Other(anyhow::anyhow!("wav write: {e}")))?;
        writer
            .finalize()
            .map_err(|e| HarkError::Other(anyhow::anyhow!("wav finalize: {e}")))?;
    }
    Ok(cursor.into_inner())
}
