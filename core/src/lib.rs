//! PortDisco Core Library
//!
//! Live port discovery for a local companion process. A client connects
//! over WebSocket, registers the process ids it cares about, and is told
//! whenever one of those processes (or any of its descendants) starts
//! listening on a new TCP port.
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Sockets, process lineage and wire messages
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: Platform port enumeration and process tables
//! - `application`: Session state, ancestry matching and the session loop
//! - `server`: Authorized WebSocket upgrade, one session per connection
//!
//! # Platform Support
//! - Linux: Reads `/proc/net/*` and `/proc/<pid>/{fd,stat,comm}`
//! - macOS: Uses `lsof` and `ps` commands
//! - Windows: Not supported

// Hexagonal architecture layers
pub mod domain;
pub mod ports;
pub mod adapters;
pub mod application;

pub mod config;
pub mod error;
pub mod server;

// Re-export domain types (primary API)
pub use domain::{ControlMessage, Lineage, ListeningSocket, Notification, Protocol};

// Re-export other commonly used types
pub use adapters::{PortPoller, PortScanner, ProcessTable};
pub use application::{Session, SessionOptions};
pub use config::{ConfigStore, RelayConfig};
pub use error::{Error, Result};
pub use ports::{AncestryResolver, PortEnumerator, PortPoll};
pub use server::{generate_nonce, RelayServer, ServerDetails, DISCOVERY_PATH};
