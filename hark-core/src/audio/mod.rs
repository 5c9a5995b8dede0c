//! Audio capture via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not**:
//! - Allocate heap memory
//! - Block on a mutex or condvar
//! - Perform I/O
//!
//! This module satisfies that contract by writing directly into an SPSC ring
//! buffer producer whose `push_slice` is lock-free and allocation-free. The
//! blocking consumer side is a [`FrameAssembler`], which resamples to the
//! requested rate and assembles fixed-size i16 frames for the session loop.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). A [`MicStream`] must therefore be opened and dropped on the same
//! thread; the listener service does both inside `spawn_blocking`.

pub mod cue;
pub mod normalize;
pub mod resample;
pub mod wav;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use crate::audio::resample::RateConverter;
use crate::buffering::frame::{Frame, FrameSpec};
use crate::buffering::{CaptureConsumer, Consumer};
use crate::error::{HarkError, Result};

/// Blocking source of fixed-size frames.
///
/// Dropping the stream releases the underlying device; the session loop
/// relies on that on every exit path, including cancellation and timeout.
pub trait FrameStream {
    /// Block until one full frame of audio is available.
    fn read_frame(&mut self) -> Result<Frame>;
}

/// Factory for frame streams; one stream is opened per listening session.
pub trait CaptureSource: Send {
    fn open(&mut self, spec: &FrameSpec) -> Result<Box<dyn FrameStream>>;
}

/// Sleep used by blocking readers when the ring is empty
/// (avoids busy-wait burning a core).
const SLEEP_EMPTY: Duration = Duration::from_millis(5);

/// Chunk size drained from the ring buffer per iteration.
/// 20 ms at 48 kHz = 960 samples, a reasonable resampler stride for
/// common capture rates.
const DRAIN_CHUNK: usize = 960;

/// Consumer side of a capture ring: drains f32 samples, resamples them to
/// the requested rate, and assembles fixed-size i16 frames.
///
/// The `failed` flag is shared with the capture backend's error callback.
/// Once set, `read_frame` drains whatever already sits in the ring, then
/// returns `HarkError::CaptureStream` instead of waiting on a ring no
/// producer will ever fill again — a dead device must end the session, not
/// hang it.
pub struct FrameAssembler {
    consumer: CaptureConsumer,
    converter: RateConverter,
    spec: FrameSpec,
    failed: Arc<AtomicBool>,
    /// Resampled samples not yet assembled into a frame.
    pending: Vec<f32>,
    /// Scratch buffer reused each drain.
    scratch: Vec<f32>,
}

impl FrameAssembler {
    pub fn new(
        consumer: CaptureConsumer,
        converter: RateConverter,
        spec: FrameSpec,
        failed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            consumer,
            converter,
            spec,
            failed,
            pending: Vec::new(),
            scratch: vec![0f32; DRAIN_CHUNK],
        }
    }

    /// Block until one full frame is available or the backend has failed.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let frame_len = self.spec.samples_per_frame();
        loop {
            if self.pending.len() >= frame_len {
                let samples: Vec<i16> = self
                    .pending
                    .drain(..frame_len)
                    .map(|s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
                    .collect();
                return Ok(Frame::new(samples, self.spec.sample_rate_hz));
            }

            let n = self.consumer.pop_slice(&mut self.scratch);
            if n == 0 {
                if self.failed.load(Ordering::Acquire) {
                    return Err(HarkError::CaptureStream(
                        "capture backend reported a stream error".into(),
                    ));
                }
                std::thread::sleep(SLEEP_EMPTY);
                continue;
            }
            let resampled = self.converter.process(&self.scratch[..n]);
            self.pending.extend_from_slice(&resampled);
        }
    }
}

#[cfg(feature = "audio-cpal")]
mod mic {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use cpal::{
        traits::{DeviceTrait, HostTrait, StreamTrait},
        SampleFormat, SampleRate, Stream, StreamConfig,
    };
    use tracing::{error, info, warn};

    use super::{CaptureSource, FrameAssembler, FrameStream, DRAIN_CHUNK};
    use crate::audio::resample::RateConverter;
    use crate::buffering::{create_capture_ring, frame::Frame, frame::FrameSpec, Producer};
    use crate::error::{HarkError, Result};

    /// Microphone capture source backed by the default cpal host.
    pub struct MicCapture {
        preferred_device: Option<String>,
    }

    impl MicCapture {
        pub fn new() -> Self {
            Self {
                preferred_device: None,
            }
        }

        /// Prefer an input device by name, falling back to the default.
        pub fn with_preferred_device(name: impl Into<String>) -> Self {
            Self {
                preferred_device: Some(name.into()),
            }
        }
    }

    impl Default for MicCapture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CaptureSource for MicCapture {
        fn open(&mut self, spec: &FrameSpec) -> Result<Box<dyn FrameStream>> {
            let stream = MicStream::open(spec, self.preferred_device.as_deref())?;
            Ok(Box::new(stream))
        }
    }

    /// An open microphone stream delivering fixed-size i16 frames.
    ///
    /// **Not `Send`** — `cpal::Stream` is bound to its creation thread on
    /// Windows/macOS. Open and drop this type on the same OS thread.
    pub struct MicStream {
        /// Kept alive so the stream is not dropped prematurely.
        _stream: Stream,
        /// Shared flag — cleared on drop so the callback no-ops.
        running: Arc<AtomicBool>,
        assembler: FrameAssembler,
    }

    impl MicStream {
        fn open(spec: &FrameSpec, preferred_device: Option<&str>) -> Result<Self> {
            let host = cpal::default_host();

            let mut selected = None;
            if let Some(name) = preferred_device {
                match host.input_devices() {
                    Ok(mut devices) => {
                        selected = devices
                            .find(|d| d.name().map(|n| n == name).unwrap_or(false));
                        if selected.is_none() {
                            warn!("preferred input device '{name}' not found, falling back");
                        }
                    }
                    Err(e) => warn!("failed to list input devices: {e}"),
                }
            }

            let device = match selected.or_else(|| host.default_input_device()) {
                Some(d) => d,
                None => return Err(HarkError::NoDefaultInputDevice),
            };

            info!(
                device = device.name().unwrap_or_default().as_str(),
                "opening input device"
            );

            let supported = device
                .default_input_config()
                .map_err(|e| HarkError::CaptureDevice(e.to_string()))?;
            let capture_rate = supported.sample_rate().0;
            let channels = supported.channels();

            info!(capture_rate, channels, "capture config selected");

            let config = StreamConfig {
                channels,
                sample_rate: SampleRate(capture_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let (mut producer, consumer) = create_capture_ring();
            let running = Arc::new(AtomicBool::new(true));
            // Set by the error callback; the assembler turns it into a
            // CaptureStream error at the next empty-ring check.
            let failed = Arc::new(AtomicBool::new(false));

            let running_f32 = Arc::clone(&running);
            let running_i16 = Arc::clone(&running);
            let failed_f32 = Arc::clone(&failed);
            let failed_i16 = Arc::clone(&failed);
            let ch = channels as usize;

            let stream = match supported.sample_format() {
                SampleFormat::F32 => {
                    let mut mix_buf: Vec<f32> = Vec::new();
                    device.build_input_stream(
                        &config,
                        move |data: &[f32], _info| {
                            if !running_f32.load(Ordering::Relaxed) {
                                return;
                            }
                            let mono = if ch == 1 {
                                data
                            } else {
                                downmix(data, ch, &mut mix_buf);
                                mix_buf.as_slice()
                            };
                            let written = producer.push_slice(mono);
                            if written < mono.len() {
                                warn!(
                                    "capture ring full: dropped {} samples",
                                    mono.len() - written
                                );
                            }
                        },
                        move |err| {
                            error!("capture stream error: {err}");
                            failed_f32.store(true, Ordering::Release);
                        },
                        None,
                    )
                }
                SampleFormat::I16 => {
                    let mut mix_buf: Vec<f32> = Vec::new();
                    device.build_input_stream(
                        &config,
                        move |data: &[i16], _info| {
                            if !running_i16.load(Ordering::Relaxed) {
                                return;
                            }
                            let frames = data.len() / ch;
                            mix_buf.resize(frames, 0.0);
                            for f in 0..frames {
                                let mut sum = 0f32;
                                let base = f * ch;
                                for c in 0..ch {
                                    sum += data[base + c] as f32 / 32768.0;
                                }
                                mix_buf[f] = sum / ch as f32;
                            }
                            let written = producer.push_slice(&mix_buf);
                            if written < mix_buf.len() {
                                warn!(
                                    "capture ring full: dropped {} samples",
                                    mix_buf.len() - written
                                );
                            }
                        },
                        move |err| {
                            error!("capture stream error: {err}");
                            failed_i16.store(true, Ordering::Release);
                        },
                        None,
                    )
                }
                fmt => {
                    return Err(HarkError::CaptureStream(format!(
                        "unsupported sample format: {fmt:?}"
                    )))
                }
            }
            .map_err(|e| HarkError::CaptureStream(e.to_string()))?;

            stream
                .play()
                .map_err(|e| HarkError::CaptureStream(e.to_string()))?;

            let converter = RateConverter::new(capture_rate, spec.sample_rate_hz, DRAIN_CHUNK)?;
            let assembler = FrameAssembler::new(consumer, converter, *spec, failed);

            Ok(Self {
                _stream: stream,
                running,
                assembler,
            })
        }
    }

    impl FrameStream for MicStream {
        fn read_frame(&mut self) -> Result<Frame> {
            self.assembler.read_frame()
        }
    }

    impl Drop for MicStream {
        fn drop(&mut self) {
            self.running.store(false, Ordering::Release);
        }
    }

    /// Average interleaved channels down to mono.
    fn downmix(data: &[f32], channels: usize, out: &mut Vec<f32>) {
        let frames = data.len() / channels;
        out.resize(frames, 0.0);
        for f in 0..frames {
            let mut sum = 0f32;
            let base = f * channels;
            for c in 0..channels {
                sum += data[base + c];
            }
            out[f] = sum / channels as f32;
        }
    }
}

#[cfg(feature = "audio-cpal")]
pub use mic::{MicCapture, MicStream};

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
pub struct MicCapture;

#[cfg(not(feature = "audio-cpal"))]
impl MicCapture {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(feature = "audio-cpal"))]
impl Default for MicCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(feature = "audio-cpal"))]
impl CaptureSource for MicCapture {
    fn open(&mut self, _spec: &FrameSpec) -> Result<Box<dyn FrameStream>> {
        Err(crate::error::HarkError::CaptureStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}
