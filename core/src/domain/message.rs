//! Messages exchanged on a port discovery connection.
//!
//! Every frame carries one JSON object with a `type` field:
//! - client → relay: `addPID` / `removePID` with a `pid`
//! - relay → client: `newPort` with a `port` and a human-readable `message`

use serde::{Deserialize, Serialize};

use super::ListeningSocket;

// ============================================================================
// Inbound
// ============================================================================

/// Raw inbound frame. Unknown fields are ignored, a missing `pid` is 0.
///
/// `pid` is any JSON integer; whether it names a real process is the
/// receiver's call.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    pid: i64,
}

/// A decoded control message from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Register a process of interest.
    AddPid(i64),
    /// Forget a previously registered process.
    RemovePid(i64),
    /// Well-formed JSON with a `type` this relay does not handle.
    Unrecognized(String),
}

impl ControlMessage {
    /// Decode a control message from a JSON frame.
    ///
    /// Fails only on malformed JSON or a `pid` that is not an integer; an
    /// unknown `type` decodes to [`ControlMessage::Unrecognized`].
    pub fn parse(payload: &[u8]) -> serde_json::Result<Self> {
        let envelope: Envelope = serde_json::from_slice(payload)?;
        Ok(match envelope.kind.as_str() {
            "addPID" => ControlMessage::AddPid(envelope.pid),
            "removePID" => ControlMessage::RemovePid(envelope.pid),
            _ => ControlMessage::Unrecognized(envelope.kind),
        })
    }
}

/// A registration mutation that has been applied to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationChange {
    Added(u32),
    Removed(u32),
}

// ============================================================================
// Outbound
// ============================================================================

/// A message pushed from the relay to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    /// A port owned by a process of interest started listening.
    #[serde(rename = "newPort")]
    NewPort { port: u16, message: String },
}

impl Notification {
    /// Build the prompt for a newly discovered socket.
    pub fn new_port(socket: &ListeningSocket) -> Self {
        Notification::NewPort {
            port: socket.port,
            message: format!(
                "Port {} was started by {:?}, would you like to share it over the internet?",
                socket.port, socket.process_name
            ),
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
