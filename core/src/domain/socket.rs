//! Listening socket domain model.

use serde::{Deserialize, Serialize};

// ============================================================================
// Protocol
// ============================================================================

/// Transport protocol of a listening socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    /// Short lowercase name ("tcp", "udp").
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ListeningSocket
// ============================================================================

/// A socket bound on this host and accepting traffic, as seen by one poll.
///
/// Produced fresh on every enumeration; nothing here outlives a poll cycle
/// except the port number a session may remember as already notified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListeningSocket {
    /// The port number (e.g., 3000, 8080).
    pub port: u16,

    /// Transport protocol.
    pub protocol: Protocol,

    /// Process ID of the owning process, 0 when the owner is unknown.
    pub pid: u32,

    /// Display name of the owning process.
    pub process_name: String,

    /// Local address the socket is bound to (e.g., "127.0.0.1", "[::1]", "*").
    pub address: String,
}

impl ListeningSocket {
    /// Create a socket entry from enumeration results.
    pub fn new(
        port: u16,
        protocol: Protocol,
        pid: u32,
        process_name: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            port,
            protocol,
            pid,
            process_name: process_name.into(),
            address: address.into(),
        }
    }

    /// Shorthand for a TCP listener.
    pub fn tcp(port: u16, pid: u32, process_name: impl Into<String>) -> Self {
        Self::new(port, Protocol::Tcp, pid, process_name, "127.0.0.1")
    }

    /// Shorthand for a bound UDP socket.
    pub fn udp(port: u16, pid: u32, process_name: impl Into<String>) -> Self {
        Self::new(port, Protocol::Udp, pid, process_name, "127.0.0.1")
    }

    pub fn is_tcp(&self) -> bool {
        self.protocol == Protocol::Tcp
    }

    /// Whether the socket is bound to a loopback address only.
    pub fn is_loopback(&self) -> bool {
        let addr = self.address.trim_start_matches('[').trim_end_matches(']');
        addr.parse::<std::net::IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
    }

    /// Ordering key used to keep enumeration results stable between polls.
    pub(crate) fn sort_key(&self) -> (u16, Protocol, u32) {
        (self.port, self.protocol, self.pid)
    }
}

impl std::fmt::Display for ListeningSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}:{} (PID: {}, Process: {})",
            self.protocol, self.address, self.port, self.pid, self.process_name
        )
    }
}
