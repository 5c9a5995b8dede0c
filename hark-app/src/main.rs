//! Terminal host for the hark listening engine.
//!
//! Listens on the default microphone, segments utterances, and prints each
//! transcription event as one JSON line. Ctrl-C flushes any in-progress
//! utterance before exiting — interrupted speech is emitted, not dropped.
//!
//! Usage: `hark [wake-phrase]`
//! Environment: `RUST_LOG` controls log verbosity (e.g. `hark_core=debug`).

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hark_core::{
    EnergyClassifier, Listener, ListenerConfig, ListenerService, ListenerStatus, MicCapture,
    StubTranscriber, TranscriberHandle,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let wake_phrase = std::env::args().nth(1).unwrap_or_default();
    if wake_phrase.is_empty() {
        info!("no wake phrase given — printing every utterance");
    } else {
        info!(wake_phrase, "listening for wake phrase");
    }

    let config = ListenerConfig {
        wake_phrase,
        ..ListenerConfig::default()
    };

    let listener = Listener::new(
        config,
        Box::new(MicCapture::new()),
        Box::new(EnergyClassifier::new(1)),
        TranscriberHandle::new(StubTranscriber::new()),
        TranscriberHandle::new(StubTranscriber::new()),
    );

    let service = Arc::new(ListenerService::new());
    let mut utterances = service.subscribe_utterances();
    let mut statuses = service.subscribe_status();
    service.start(listener)?;

    let interrupt_service = Arc::clone(&service);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received — flushing and stopping");
            let _ = interrupt_service.stop();
        }
    });

    loop {
        tokio::select! {
            event = utterances.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(_) => break,
            },
            status = statuses.recv() => match status {
                Ok(status) if matches!(status.status, ListenerStatus::Stopped | ListenerStatus::Error) => {
                    info!(status = ?status.status, "listener finished");
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            },
        }
    }

    Ok(())
}
