//! Audible cue playback around active listening.
//!
//! Fire-and-forget: the session loop never waits on playback and never
//! fails because of it. Errors are logged and swallowed.

use std::path::Path;

/// Plays a short cue file (e.g. a high beep before active listening and a
/// low beep after).
pub trait CuePlayer: Send {
    fn play(&self, path: &Path);
}

/// No-op player for headless use and tests.
pub struct NullCue;

impl CuePlayer for NullCue {
    fn play(&self, _path: &Path) {}
}

#[cfg(feature = "audio-cpal")]
mod beep {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use tracing::warn;

    use super::CuePlayer;

    /// Cue player backed by the default cpal output device.
    ///
    /// Playback runs on a detached thread; the cpal output stream lives and
    /// dies on that thread (it is `!Send`).
    pub struct BeepPlayer;

    impl CuePlayer for BeepPlayer {
        fn play(&self, path: &Path) {
            let path: PathBuf = path.to_path_buf();
            std::thread::spawn(move || {
                if let Err(e) = play_wav(&path) {
                    warn!(path = %path.display(), "cue playback failed: {e}");
                }
            });
        }
    }

    fn play_wav(path: &Path) -> anyhow::Result<()> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<Result<_, _>>()?,
            hound::SampleFormat::Float => {
                reader.samples::<f32>().collect::<Result<_, _>>()?
            }
        };
        let channels = spec.channels as usize;
        let duration =
            Duration::from_secs_f64(samples.len() as f64 / channels as f64 / spec.sample_rate as f64);

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("no default output device"))?;
        let config = cpal::StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let mut cursor = 0usize;
        let stream = device.build_output_stream(
            &config,
            move |out: &mut [f32], _info| {
                for slot in out.iter_mut() {
                    *slot = samples.get(cursor).copied().unwrap_or(0.0);
                    cursor = cursor.saturating_add(1);
                }
            },
            |err| warn!("cue output stream error: {err}"),
            None,
        )?;
        stream.play()?;

        // Keep the stream alive until the cue has finished, plus a little
        // margin for the device buffer.
        std::thread::sleep(duration + Duration::from_millis(100));
        Ok(())
    }
}

#[cfg(feature = "audio-cpal")]
pub use beep::BeepPlayer;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_cue_is_a_no_op() {
        NullCue.play(Path::new("/nonexistent/beep_hi.wav"));
    }
}
