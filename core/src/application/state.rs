//! Per-session mutable state.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::ListeningSocket;

/// The one lock a session's reader and notification loop share.
///
/// A tokio mutex: the notification pass keeps the guard across its
/// outbound sends.
pub type SharedState = Arc<Mutex<SessionState>>;

/// Registered processes and already-announced ports for one session.
///
/// `notified` only ever grows: once a port number is in it, that port is
/// never announced again for the lifetime of the session, even if its
/// listener closes and something else binds it later.
#[derive(Debug, Default)]
pub struct SessionState {
    registered: HashSet<u32>,
    notified: HashSet<u16>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh state in the shared lock.
    pub fn shared() -> SharedState {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Record every TCP port already listening so it is never announced.
    ///
    /// Returns how many ports were recorded.
    pub fn seed(&mut self, sockets: &[ListeningSocket]) -> usize {
        let before = self.notified.len();
        for socket in sockets.iter().filter(|s| s.is_tcp()) {
            tracing::debug!(
                port = socket.port,
                pid = socket.pid,
                process = %socket.process_name,
                "pre-setting port"
            );
            self.notified.insert(socket.port);
        }
        self.notified.len() - before
    }

    /// Register a process of interest. Returns false if it already was.
    pub fn register(&mut self, pid: u32) -> bool {
        self.registered.insert(pid)
    }

    /// Forget a process. Returns false if it was not registered.
    pub fn unregister(&mut self, pid: u32) -> bool {
        self.registered.remove(&pid)
    }

    pub fn is_registered(&self, pid: u32) -> bool {
        self.registered.contains(&pid)
    }

    pub fn registered(&self) -> &HashSet<u32> {
        &self.registered
    }

    pub fn was_notified(&self, port: u16) -> bool {
        self.notified.contains(&port)
    }

    /// Record a port as announced. Returns false if it already was.
    pub fn mark_notified(&mut self, port: u16) -> bool {
        self.notified.insert(port)
    }
}
