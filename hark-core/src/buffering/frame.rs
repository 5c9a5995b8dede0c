//! Typed audio frame passed from the capture stream to the classifier and
//! the endpoint detector.

use crate::error::{HarkError, Result};

/// Canonical sample rate for endpointing and transcription handoff.
pub const CANONICAL_SAMPLE_RATE_HZ: u32 = 16_000;

/// Shape of a capture frame: sample rate plus frame duration.
///
/// Frame duration is restricted to 10, 20 or 30 ms — the granularities
/// per-frame speech classifiers are built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpec {
    /// Sample rate in Hz (canonically 16 000).
    pub sample_rate_hz: u32,
    /// Frame duration in milliseconds (10, 20 or 30).
    pub frame_duration_ms: u32,
}

impl FrameSpec {
    pub fn new(sample_rate_hz: u32, frame_duration_ms: u32) -> Result<Self> {
        if !matches!(frame_duration_ms, 10 | 20 | 30) {
            return Err(HarkError::UnsupportedFrameDuration(frame_duration_ms));
        }
        Ok(Self {
            sample_rate_hz,
            frame_duration_ms,
        })
    }

    /// Number of i16 samples in one frame.
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate_hz as usize * self.frame_duration_ms as usize) / 1000
    }

    /// How many whole frames cover `millis` of audio.
    pub fn frames_in_ms(&self, millis: u32) -> usize {
        (millis / self.frame_duration_ms) as usize
    }
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            sample_rate_hz: CANONICAL_SAMPLE_RATE_HZ,
            frame_duration_ms: 30,
        }
    }
}

/// One fixed-duration block of mono i16 PCM samples.
///
/// Immutable once captured; ownership moves from the capture stream through
/// the classifier into the detector.
#[derive(Debug, Clone)]
pub struct Frame {
    samples: Vec<i16>,
    sample_rate_hz: u32,
}

impl Frame {
    pub fn new(samples: Vec<i16>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }
}
