//! One client connection, from upgrade to close.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::notifier::PortNotifier;
use super::reader::ControlReader;
use super::state::SessionState;
use crate::config::RelayConfig;
use crate::domain::RegistrationChange;
use crate::error::{Error, Result};
use crate::ports::{AncestryResolver, PortEnumerator, PortPoll};

/// Timing and limits for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Period of the notification loop. The first tick fires one period
    /// after the session starts.
    pub poll_interval: Duration,
    /// Cap on parent lookups per ancestry match.
    pub max_ancestry_depth: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for SessionOptions {
    fn from(config: &RelayConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_ancestry_depth: config.max_ancestry_depth,
        }
    }
}

/// A port discovery session over an upgraded WebSocket.
///
/// Runs the control reader and the notification loop concurrently over
/// one [`SessionState`]. The session ends when the shutdown signal fires,
/// when the reader stops (client closed or sent an undecodable frame), or
/// when a notification cannot be delivered.
pub struct Session<T, E, R> {
    id: Uuid,
    ws: WebSocketStream<T>,
    enumerator: Arc<E>,
    resolver: R,
    options: SessionOptions,
    observer: Option<mpsc::UnboundedSender<RegistrationChange>>,
}

impl<T, E, R> Session<T, E, R>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    E: PortEnumerator + 'static,
    R: AncestryResolver + 'static,
{
    pub fn new(ws: WebSocketStream<T>, enumerator: E, resolver: R, options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            ws,
            enumerator: Arc::new(enumerator),
            resolver,
            options,
            observer: None,
        }
    }

    /// Receive a [`RegistrationChange`] after every applied `addPID` /
    /// `removePID`, so tests can wait for the reader instead of sleeping.
    pub(crate) fn with_observer(
        mut self,
        observer: Option<mpsc::UnboundedSender<RegistrationChange>>,
    ) -> Self {
        self.observer = observer;
        self
    }

    /// Drive the session to completion.
    ///
    /// `shutdown` cancels the session when it flips to `true` or its sender
    /// is dropped. Returns an error if the initial enumeration fails or a
    /// notification cannot be sent; every other way out is `Ok`.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let span = info_span!("session", id = %self.id);
        self.run_inner(shutdown).instrument(span).await
    }

    async fn run_inner(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let Session {
            ws,
            enumerator,
            resolver,
            options,
            observer,
            ..
        } = self;
        let (mut sink, stream) = ws.split();
        let state = SessionState::shared();

        let initial = match poll_blocking(&enumerator).await {
            Ok(poll) => poll,
            Err(e) => {
                warn!(error = %e, "initial port enumeration failed");
                let _ = sink.close().await;
                return Err(e);
            }
        };
        let seeded = state.lock().await.seed(&initial.sockets);
        info!(seeded, "session started");

        let reader = ControlReader::new(stream, state.clone(), observer);
        let mut reader_task = tokio::spawn(reader.run());

        let notifier = PortNotifier::new(resolver, options.max_ancestry_depth);
        let period = options.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = if *shutdown.borrow() {
            Ok(())
        } else {
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!("session cancelled");
                            break Ok(());
                        }
                    }
                    _ = &mut reader_task => {
                        debug!("control reader stopped");
                        break Ok(());
                    }
                    _ = ticker.tick() => {
                        let poll = match poll_blocking(&enumerator).await {
                            Ok(poll) => poll,
                            Err(e) => {
                                warn!(error = %e, "error polling listening ports");
                                continue;
                            }
                        };
                        if !poll.changed {
                            continue;
                        }

                        let mut guard = state.lock().await;
                        if let Err(e) = notifier.handle_port_updates(&mut guard, &poll.sockets, &mut sink).await {
                            warn!(error = %e, "failed to deliver notification");
                            break Err(e);
                        }
                    }
                }
            }
        };

        reader_task.abort();
        let _ = sink.close().await;
        info!("session closed");
        result
    }
}

/// Poll on the blocking pool. The loop still waits for the result, but
/// other sessions and the accept loop keep running meanwhile.
async fn poll_blocking<E: PortEnumerator + 'static>(enumerator: &Arc<E>) -> Result<PortPoll> {
    let enumerator = Arc::clone(enumerator);
    tokio::task::spawn_blocking(move || enumerator.poll())
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}
