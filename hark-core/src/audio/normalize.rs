//! Peak normalization of a finished utterance.
//!
//! Single deterministic pass: every sample is scaled by
//! `target_peak / current_peak`. A pure-silence buffer (all zeros) is
//! returned unchanged — silence is a valid recognition result, not an
//! arithmetic fault.

/// Default target peak: full i16 scale.
pub const DEFAULT_TARGET_PEAK: i16 = i16::MAX;

/// Rescale `samples` in place so the loudest sample hits `target_peak`.
///
/// No-op when the input is all-zero. Results saturate at the i16 range, so
/// a `current_peak` of `i16::MIN` cannot overflow.
pub fn normalize_peak(samples: &mut [i16], target_peak: i16) {
    let current_peak = samples
        .iter()
        .map(|&s| (s as i32).unsigned_abs())
        .max()
        .unwrap_or(0);
    if current_peak == 0 {
        return;
    }

    let scale = target_peak as f64 / current_peak as f64;
    for sample in samples.iter_mut() {
        let scaled = (*sample as f64 * scale).round();
        *sample = scaled.clamp(i16::MIN as f64, i16::MAX as f64) as i16;
    }
}
