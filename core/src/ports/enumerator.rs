//! Port enumerator port (interface).

use crate::domain::ListeningSocket;
use crate::error::Result;

/// One poll of the host's listening sockets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortPoll {
    /// Every socket currently listening, in enumeration order.
    pub sockets: Vec<ListeningSocket>,
    /// Whether the set differs from the previous poll's result.
    pub changed: bool,
}

/// Port for enumerating listening sockets.
///
/// Implementations remember their previous result so callers can skip
/// work when nothing moved. Polling is synchronous: it runs inside the
/// caller's task.
pub trait PortEnumerator: Send + Sync {
    /// Enumerate listening sockets (loopback-bound listeners included).
    fn poll(&self) -> Result<PortPoll>;
}
