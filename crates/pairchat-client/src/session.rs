//! Session client: one connection, one state machine.
//!
//! All transitions go through the `watch` channel's lock, so each inbound
//! frame, close, or local action is applied to completion before the next.
//! Every connection is tagged with a generation number. `stop` bumps the
//! generation before tearing the connection down, so nothing a replaced
//! connection delivers afterwards can reach the state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pairchat_core::{
    ClientEvent, Credential, FinishedSession, OutboundFrame, SessionState, Status, Transition,
};
use pairchat_settings::PairchatSettings;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::transport::{Connector, Link, redact_url, session_url};

/// How long `stop` waits for the connection task to send its close frame.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Session client configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// WebSocket base URL; `/ws/{credential}` is appended.
    pub ws_url: String,
    /// Upper bound on the handshake.
    pub connect_timeout: Duration,
    /// Outbound queue capacity.
    pub outbound_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&PairchatSettings::default())
    }
}

impl SessionConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &PairchatSettings) -> Self {
        Self {
            ws_url: settings.server.ws_url.clone(),
            connect_timeout: Duration::from_millis(settings.client.connect_timeout_ms),
            outbound_buffer: settings.client.outbound_buffer.max(1),
        }
    }
}

/// Capacity of the finished-session broadcast.
const FINISHED_CAPACITY: usize = 64;

/// State shared between the client handle and its connection task.
struct Shared {
    state: watch::Sender<SessionState>,
    finished: broadcast::Sender<FinishedSession>,
    generation: AtomicU64,
}

impl Shared {
    fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run `step` under the state lock if `generation` is still current
    /// (`None` skips the check). A finished session is broadcast before
    /// watchers see the new state. `None` means the event came from a
    /// superseded connection and was dropped.
    fn step<F>(&self, generation: Option<u64>, step: F) -> Option<Transition>
    where
        F: FnOnce(&mut SessionState) -> (Transition, Option<FinishedSession>),
    {
        let mut outcome = None;
        let _ = self.state.send_if_modified(|state| {
            if generation.is_some_and(|g| g != self.current()) {
                return false;
            }
            let (transition, finished) = step(state);
            if let Some(finished) = finished {
                debug!(
                    session_id = %finished.session.session_id,
                    entries = finished.transcript.len(),
                    "pairing session finished"
                );
                let _ = self.finished.send(finished);
            }
            outcome = Some(transition);
            transition.is_applied()
        });
        outcome
    }

    fn apply(&self, generation: u64, event: ClientEvent) -> Option<Transition> {
        let outcome = self.step(Some(generation), |state| state.advance(event));
        if outcome.is_none() {
            debug!(generation, "dropping event from superseded connection");
        }
        outcome
    }

    fn apply_text(&self, generation: u64, text: &str) -> Option<Transition> {
        self.step(Some(generation), |state| state.advance_text(text))
    }

    /// Mark the state closed regardless of generation.
    fn force_close(&self) {
        let _ = self.step(None, |state| state.advance(ClientEvent::Closed));
    }
}

struct ActiveConnection {
    generation: u64,
    outbound: mpsc::Sender<OutboundFrame>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Owns at most one connection and the state machine fed by it.
pub struct SessionClient {
    connector: Arc<dyn Connector>,
    config: SessionConfig,
    shared: Arc<Shared>,
    active: Option<ActiveConnection>,
}

impl SessionClient {
    /// Create an idle client. Nothing connects until [`start`](Self::start).
    pub fn new(connector: Arc<dyn Connector>, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::new());
        let (finished, _) = broadcast::channel(FINISHED_CAPACITY);
        Self {
            connector,
            config,
            shared: Arc::new(Shared {
                state,
                finished,
                generation: AtomicU64::new(0),
            }),
            active: None,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Current display status.
    pub fn status(&self) -> Status {
        self.shared.state.borrow().status()
    }

    /// Observe the latest state. Transitions that land between two reads
    /// coalesce into one snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Receive every pairing session as it ends, with its full transcript.
    ///
    /// Each finished session is sent before the state change that ended it
    /// becomes visible through [`subscribe`](Self::subscribe).
    pub fn finished_sessions(&self) -> broadcast::Receiver<FinishedSession> {
        self.shared.finished.subscribe()
    }

    /// Whether a connection task is running.
    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|a| !a.task.is_finished())
    }

    /// Generation of the current connection (0 before the first start).
    pub fn generation(&self) -> u64 {
        self.shared.current()
    }

    /// Open a connection for `credential`, closing any previous one first.
    ///
    /// Connect failures and timeouts leave the status `disconnected`; they
    /// are logged, not returned. There is no retry.
    pub async fn start(&mut self, credential: Credential) {
        self.stop().await;

        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.shared.state.send_replace(SessionState::new());

        if credential.is_empty() {
            warn!(generation, "refusing to connect with an empty credential");
            let _ = self.shared.apply(generation, ClientEvent::Closed);
            return;
        }

        let url = session_url(&self.config.ws_url, &credential);
        let endpoint = redact_url(&url);
        info!(generation, %endpoint, "connecting");

        let link = match tokio::time::timeout(
            self.config.connect_timeout,
            self.connector.connect(&url),
        )
        .await
        {
            Ok(Ok(link)) => link,
            Ok(Err(error)) => {
                warn!(generation, %error, "connect failed");
                let _ = self.shared.apply(generation, ClientEvent::Closed);
                return;
            }
            Err(_) => {
                warn!(
                    generation,
                    timeout_ms = u64::try_from(self.config.connect_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                    "connect timed out"
                );
                let _ = self.shared.apply(generation, ClientEvent::Closed);
                return;
            }
        };

        let _ = self.shared.apply(generation, ClientEvent::Opened);
        info!(generation, "connection open");

        let (outbound, outbound_rx) = mpsc::channel(self.config.outbound_buffer);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let span = info_span!("connection", generation);
        let task = tokio::spawn(
            run_connection(link, outbound_rx, shutdown_rx, self.shared.clone(), generation)
                .instrument(span),
        );

        self.active = Some(ActiveConnection {
            generation,
            outbound,
            shutdown: Some(shutdown),
            task,
        });
    }

    /// Close the connection if one is open. Idempotent.
    ///
    /// Waits briefly for the close frame to go out, then aborts the task.
    pub async fn stop(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let _ = self.shared.generation.fetch_add(1, Ordering::AcqRel);

        if let Some(shutdown) = active.shutdown.take() {
            let _ = shutdown.send(());
        }
        if tokio::time::timeout(CLOSE_GRACE, &mut active.task).await.is_err() {
            debug!(generation = active.generation, "close grace elapsed, aborting");
            active.task.abort();
        }

        self.shared.force_close();
        info!(generation = active.generation, "connection stopped");
    }

    /// Send chat text to the partner. A no-op unless the connection is open
    /// and a pairing session exists. Returns whether a frame was queued.
    pub fn send_chat(&self, text: &str) -> bool {
        let frame = self.shared.state.borrow().chat_frame(text);
        self.enqueue(frame)
    }

    /// Ask the server to end the pairing session. Same precondition as
    /// [`send_chat`](Self::send_chat). Local state is left as is until the
    /// server's `session_end` arrives.
    pub fn end_session(&self) -> bool {
        let frame = self.shared.state.borrow().end_frame();
        self.enqueue(frame)
    }

    fn enqueue(&self, frame: Option<OutboundFrame>) -> bool {
        let (Some(frame), Some(active)) = (frame, self.active.as_ref()) else {
            return false;
        };
        match active.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                warn!(kind = frame.kind(), "outbound queue full, dropping frame");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = self.shared.generation.fetch_add(1, Ordering::AcqRel);
            active.task.abort();
        }
    }
}

/// Pump one connection until either side closes.
async fn run_connection(
    link: Link,
    mut outbound: mpsc::Receiver<OutboundFrame>,
    mut shutdown: oneshot::Receiver<()>,
    shared: Arc<Shared>,
    generation: u64,
) {
    let Link {
        mut sink,
        mut stream,
    } = link;

    let reason = loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(error) = sink.close().await {
                    debug!(%error, "close frame not sent");
                }
                break "stopped locally";
            }
            frame = outbound.recv() => {
                let Some(frame) = frame else { break "client dropped" };
                let text = match frame.encode() {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(%error, "failed to encode outbound frame");
                        continue;
                    }
                };
                if let Err(error) = sink.send(text).await {
                    warn!(%error, "send failed");
                    break "send failed";
                }
                debug!(kind = frame.kind(), session_id = %frame.session_id(), "frame sent");
            }
            msg = stream.next() => match msg {
                Some(Ok(text)) => {
                    let _ = shared.apply_text(generation, &text);
                }
                Some(Err(error)) => {
                    warn!(%error, "receive failed");
                    break "receive failed";
                }
                None => break "closed by server",
            },
        }
    };

    info!(reason, "connection closed");
    let _ = shared.apply(generation, ClientEvent::Closed);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
