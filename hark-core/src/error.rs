use thiserror::Error;

/// All errors produced by hark-core.
///
/// Deliberately absent: silent utterances (normalization passes them through
/// unchanged) and triggered-state timeouts (a normal utterance close).
#[derive(Debug, Error)]
pub enum HarkError {
    #[error("capture device error: {0}")]
    CaptureDevice(String),

    #[error("capture stream error: {0}")]
    CaptureStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("unsupported frame duration: {0} ms (must be 10, 20 or 30)")]
    UnsupportedFrameDuration(u32),

    #[error("transcription backend error: {0}")]
    Transcription(String),

    #[error("listener is already running")]
    AlreadyRunning,

    #[error("listener is not running")]
    NotRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, HarkError>;
