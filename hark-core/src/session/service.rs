//! `ListenerService` — lifecycle controller for always-on passive listening.
//!
//! ## Lifecycle
//!
//! ```text
//! ListenerService::new()
//!     └─► start(listener)   → blocking loop spawned, status = Listening
//!         └─► stop()        → token cancelled, status = Stopped
//! ```
//!
//! `start()`/`stop()` in the wrong state return an error rather than
//! panicking.
//!
//! ## Threading
//!
//! The session loop is blocking (it waits on the capture stream frame by
//! frame), so it runs on `tokio::task::spawn_blocking`. The cpal capture
//! stream is `!Send` and is opened and dropped inside each listen cycle on
//! that same thread.
//!
//! `stop()` does not join the loop; a generation counter fences instead.
//! Each loop runs under the generation it was started with and exits as soon
//! as a newer `start()` bumps the counter, so a stop/start pair can never
//! leave the old loop spinning against the re-armed `running` flag.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::{
    error::{HarkError, Result},
    events::{ListenerStatus, ListenerStatusEvent, UtteranceEvent},
    session::Listener,
};

/// Broadcast channel capacity: events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// Always-on passive listening as a start/stoppable service.
///
/// `Send + Sync` — all fields use interior mutability; wrap in `Arc` to
/// share between an app's command handlers and event-forwarding tasks.
pub struct ListenerService {
    running: Arc<AtomicBool>,
    /// Bumped by every `start()`; a loop belonging to an older generation
    /// must exit without touching shared status.
    generation: Arc<AtomicU64>,
    /// Token of the currently running listener, kept so `stop()` can reach it.
    active_token: Mutex<Option<crate::session::CancelToken>>,
    status: Arc<Mutex<ListenerStatus>>,
    utterance_tx: broadcast::Sender<UtteranceEvent>,
    status_tx: broadcast::Sender<ListenerStatusEvent>,
    seq: Arc<AtomicU64>,
}

impl ListenerService {
    pub fn new() -> Self {
        let (utterance_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            active_token: Mutex::new(None),
            status: Arc::new(Mutex::new(ListenerStatus::Idle)),
            utterance_tx,
            status_tx,
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start passive listening on a background blocking thread.
    ///
    /// # Errors
    /// `HarkError::AlreadyRunning` if already started.
    pub fn start(&self, mut listener: Listener) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HarkError::AlreadyRunning);
        }

        // Bumping the generation before Listening is broadcast fences out any
        // previous loop still winding down: it sees the stale generation and
        // exits without re-opening its capture source or touching status.
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let token = listener.cancel_token();
        token.clear();
        *self.active_token.lock() = Some(token);
        self.set_status(ListenerStatus::Listening, None);

        let running = Arc::clone(&self.running);
        let generation = Arc::clone(&self.generation);
        let status = Arc::clone(&self.status);
        let status_tx = self.status_tx.clone();
        let utterance_tx = self.utterance_tx.clone();
        let seq = Arc::clone(&self.seq);

        tokio::task::spawn_blocking(move || {
            info!("passive listening started");
            loop {
                if !running.load(Ordering::SeqCst) || generation.load(Ordering::SeqCst) != gen {
                    break;
                }
                match listener.passive_listen() {
                    Ok(Some(heard)) => {
                        let event = UtteranceEvent {
                            seq: seq.fetch_add(1, Ordering::Relaxed),
                            candidates: heard.candidates,
                            close: heard.close,
                            wake_match: heard.wake_match,
                        };
                        let _ = utterance_tx.send(event);
                    }
                    Ok(None) => {
                        // Cancelled before any trigger; loop re-checks running.
                    }
                    Err(e) => {
                        // Capture failures are fatal to the session — no
                        // silent retry against a broken device.
                        error!("listening session failed: {e}");
                        // The generation check and status write share the
                        // status lock so a concurrent start() cannot be
                        // clobbered by a dying loop.
                        let mut st = status.lock();
                        if generation.load(Ordering::SeqCst) == gen {
                            running.store(false, Ordering::SeqCst);
                            *st = ListenerStatus::Error;
                            let _ = status_tx.send(ListenerStatusEvent {
                                status: ListenerStatus::Error,
                                detail: Some(e.to_string()),
                            });
                        }
                        return;
                    }
                }
            }
            let mut st = status.lock();
            if generation.load(Ordering::SeqCst) == gen {
                info!("passive listening stopped");
                *st = ListenerStatus::Stopped;
                let _ = status_tx.send(ListenerStatusEvent {
                    status: ListenerStatus::Stopped,
                    detail: None,
                });
            } else {
                info!("listening loop superseded by a restart");
            }
        });

        Ok(())
    }

    /// Request a stop: the in-progress utterance (if any) is flushed and
    /// emitted before the loop exits.
    ///
    /// # Errors
    /// `HarkError::NotRunning` if not currently running.
    pub fn stop(&self) -> Result<()> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(HarkError::NotRunning);
        }
        self.running.store(false, Ordering::SeqCst);
        if let Some(token) = self.active_token.lock().take() {
            token.cancel();
        }
        info!("listener service stop requested");
        Ok(())
    }

    /// Current status (snapshot).
    pub fn status(&self) -> ListenerStatus {
        *self.status.lock()
    }

    /// Subscribe to finished-utterance events.
    pub fn subscribe_utterances(&self) -> broadcast::Receiver<UtteranceEvent> {
        self.utterance_tx.subscribe()
    }

    /// Subscribe to status change events.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ListenerStatusEvent> {
        self.status_tx.subscribe()
    }

    fn set_status(&self, new_status: ListenerStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        let _ = self.status_tx.send(ListenerStatusEvent {
            status: new_status,
            detail,
        });
    }
}

impl Default for ListenerService {
    fn default() -> Self {
        Self::new()
    }
}
