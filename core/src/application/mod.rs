//! Application layer - Port discovery sessions.
//!
//! A [`Session`] composes the pieces below over one WebSocket connection:
//! - [`SessionState`]: registered pids and already-announced ports
//! - [`AncestryMatcher`]: "is this pid, or one of its ancestors, registered?"
//! - [`PortNotifier`]: one diff-and-notify pass over a fresh socket list
//! - the control reader, applying `addPID` / `removePID` from the client

mod matcher;
mod notifier;
mod reader;
mod session;
mod state;

pub use matcher::AncestryMatcher;
pub use notifier::PortNotifier;
pub use session::{Session, SessionOptions};
pub use state::{SessionState, SharedState};
