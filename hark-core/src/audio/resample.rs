//! Audio sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! Microphones rarely capture at 16 kHz natively (48 kHz is the common
//! default), while the endpointer and its classifier run at the canonical
//! rate. `RateConverter` bridges that gap on the session thread, where
//! allocation is allowed.
//!
//! When capture rate == target rate, `RateConverter` is a passthrough — no
//! rubato session is created at all.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::error::{HarkError, Result};

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when capture rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Input samples carried over until a full rubato chunk is available.
    carry: Vec<f32>,
    /// How many input samples rubato expects per process call.
    chunk_size: usize,
    /// Pre-allocated rubato output: one mono channel, `output_frames_max` long.
    out_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// # Errors
    /// Returns `HarkError::CaptureDevice` if rubato fails to initialise.
    pub fn new(capture_rate: u32, target_rate: u32, chunk_size: usize) -> Result<Self> {
        if capture_rate == target_rate {
            return Ok(Self {
                resampler: None,
                carry: Vec::new(),
                chunk_size,
                out_buf: Vec::new(),
            });
        }

        let ratio = target_rate as f64 / capture_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            PolynomialDegree::Cubic,
            chunk_size,
            1, // mono
        )
        .map_err(|e| HarkError::CaptureDevice(format!("resampler init: {e}")))?;

        let out_buf = vec![vec![0f32; resampler.output_frames_max()]];

        tracing::info!(capture_rate, target_rate, chunk_size, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            carry: Vec::new(),
            chunk_size,
            out_buf,
        })
    }

    /// Process incoming samples, returning resampled output (may be empty).
    ///
    /// Samples are accumulated internally until a full `chunk_size` block is
    /// available for rubato. Any remainder is kept for the next call.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return samples.to_vec();
        };

        self.carry.extend_from_slice(samples);

        let mut result = Vec::new();
        while self.carry.len() >= self.chunk_size {
            let chunk = &self.carry[..self.chunk_size];
            match resampler.process_into_buffer(&[chunk], &mut self.out_buf, None) {
                Ok((_consumed, produced)) => {
                    result.extend_from_slice(&self.out_buf[0][..produced]);
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }
            self.carry.drain(..self.chunk_size);
        }

        result
    }

    /// Returns `true` when capture rate == target rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}
