//! Inbound control channel: applies `addPID` / `removePID` to the session.

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, warn};

use super::state::SharedState;
use crate::domain::{ControlMessage, RegistrationChange};

/// Reads control messages until the client goes away or sends garbage.
pub(crate) struct ControlReader<St> {
    stream: St,
    state: SharedState,
    observer: Option<mpsc::UnboundedSender<RegistrationChange>>,
}

impl<St> ControlReader<St>
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
{
    pub(crate) fn new(
        stream: St,
        state: SharedState,
        observer: Option<mpsc::UnboundedSender<RegistrationChange>>,
    ) -> Self {
        Self {
            stream,
            state,
            observer,
        }
    }

    /// Consume frames until the stream ends. Never fails: every way out is
    /// logged here and the caller only learns that reading stopped.
    pub(crate) async fn run(mut self) {
        loop {
            let frame = match self.stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) if is_closed(&e) => {
                    debug!(error = %e, "control connection closed");
                    return;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "error reading control message");
                    return;
                }
                None => {
                    debug!("control stream ended");
                    return;
                }
            };

            let parsed = match &frame {
                Message::Text(text) => ControlMessage::parse(text.as_str().as_bytes()),
                Message::Binary(data) => ControlMessage::parse(data),
                Message::Close(close) => {
                    debug!(?close, "client closed connection");
                    return;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            match parsed {
                Ok(message) => self.apply(message).await,
                Err(e) => {
                    warn!(error = %e, "error decoding control message");
                    return;
                }
            }
        }
    }

    async fn apply(&self, message: ControlMessage) {
        let change = match message {
            ControlMessage::AddPid(raw) => {
                let Some(pid) = process_id(raw) else { return };
                self.state.lock().await.register(pid);
                debug!(pid, "registered pid");
                RegistrationChange::Added(pid)
            }
            ControlMessage::RemovePid(raw) => {
                let Some(pid) = process_id(raw) else { return };
                self.state.lock().await.unregister(pid);
                debug!(pid, "removed pid");
                RegistrationChange::Removed(pid)
            }
            ControlMessage::Unrecognized(kind) => {
                warn!(kind = %kind, "unrecognized control message type");
                return;
            }
        };

        if let Some(observer) = &self.observer {
            let _ = observer.send(change);
        }
    }
}

/// A wire pid that no process can have is a no-op, not a protocol error.
fn process_id(raw: i64) -> Option<u32> {
    match u32::try_from(raw) {
        Ok(pid) => Some(pid),
        Err(_) => {
            warn!(pid = raw, "ignoring pid outside the process id range");
            None
        }
    }
}

/// Errors that just mean the peer is gone.
fn is_closed(error: &WsError) -> bool {
    matches!(
        error,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}
