//! Notification pass: turns a fresh socket list into `newPort` messages.

use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;

use futures_util::{Sink, SinkExt};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::matcher::AncestryMatcher;
use super::state::SessionState;
use crate::domain::{ListeningSocket, Notification};
use crate::error::{Error, Result};
use crate::ports::AncestryResolver;

/// Announces newly listening TCP ports owned by registered process trees.
pub struct PortNotifier<R: AncestryResolver> {
    resolver: Arc<R>,
    max_depth: usize,
}

impl<R: AncestryResolver + 'static> PortNotifier<R> {
    pub fn new(resolver: R, max_depth: usize) -> Self {
        Self {
            resolver: Arc::new(resolver),
            max_depth,
        }
    }

    /// Run one pass over `sockets`, sending a notification for each TCP
    /// port that was not seen before and belongs to a registered process
    /// or one of its descendants.
    ///
    /// The caller holds the session lock for the whole pass. A failed send
    /// stops the pass and is returned; everything else is logged and
    /// skipped. Returns the number of notifications sent.
    pub async fn handle_port_updates<S>(
        &self,
        state: &mut SessionState,
        sockets: &[ListeningSocket],
        sink: &mut S,
    ) -> Result<usize>
    where
        S: Sink<Message> + Unpin,
        S::Error: Display,
    {
        debug!(count = sockets.len(), "ports were updated");

        let candidates: Vec<&ListeningSocket> = sockets
            .iter()
            .filter(|socket| {
                if !socket.is_tcp() {
                    debug!(port = socket.port, protocol = %socket.protocol, "skipping non-TCP socket");
                    return false;
                }
                !state.was_notified(socket.port)
            })
            .collect();
        let pids = candidates.iter().map(|socket| socket.pid).collect();
        let verdicts = self.match_owners(state.registered(), pids).await?;

        let mut sent = 0;
        for (socket, verdict) in candidates.into_iter().zip(verdicts) {
            // the same port can be listed once per owner
            if state.was_notified(socket.port) {
                continue;
            }

            match verdict {
                Ok(true) => {}
                Ok(false) => {
                    debug!(
                        port = socket.port,
                        pid = socket.pid,
                        "port does not belong to a registered process"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(pid = socket.pid, port = socket.port, error = %e, "error matching pid");
                    continue;
                }
            }

            state.mark_notified(socket.port);
            let payload = Notification::new_port(socket).to_json()?;
            sink.send(Message::text(payload))
                .await
                .map_err(|e| Error::Notify(e.to_string()))?;

            info!(
                port = socket.port,
                pid = socket.pid,
                process = %socket.process_name,
                "sent new port notification"
            );
            sent += 1;
        }

        Ok(sent)
    }

    /// Match every owner against `registered` on the blocking pool, since
    /// each ancestry step may read procfs or fork `ps`.
    async fn match_owners(
        &self,
        registered: &HashSet<u32>,
        pids: Vec<u32>,
    ) -> Result<Vec<Result<bool>>> {
        if pids.is_empty() || registered.is_empty() {
            return Ok(pids.iter().map(|_| Ok(false)).collect());
        }

        let registered = registered.clone();
        let resolver = Arc::clone(&self.resolver);
        let max_depth = self.max_depth;
        tokio::task::spawn_blocking(move || {
            let matcher = AncestryMatcher::new(resolver.as_ref(), max_depth);
            pids.into_iter()
                .map(|pid| matcher.matches(&registered, pid))
                .collect()
        })
        .await
        .map_err(|e| Error::Task(e.to_string()))
    }
}
