//! Change-detecting wrapper around a platform scanner.

use parking_lot::Mutex;

use crate::domain::ListeningSocket;
use crate::error::Result;
use crate::ports::{PortEnumerator, PortPoll};

use super::{PortScanner, Scanner};

/// Polls a scanner and reports whether the result moved since last time.
///
/// Each session owns its own poller, so "changed" is relative to that
/// session's previous poll.
pub struct PortPoller<S: Scanner = PortScanner> {
    scanner: S,
    include_localhost: bool,
    previous: Mutex<Option<Vec<ListeningSocket>>>,
}

impl PortPoller<PortScanner> {
    /// Create a poller over the platform scanner.
    pub fn new(include_localhost: bool) -> Self {
        Self::with_scanner(PortScanner::new(), include_localhost)
    }
}

impl<S: Scanner> PortPoller<S> {
    /// Create a poller over a specific scanner.
    pub fn with_scanner(scanner: S, include_localhost: bool) -> Self {
        Self {
            scanner,
            include_localhost,
            previous: Mutex::new(None),
        }
    }
}

impl<S: Scanner> PortEnumerator for PortPoller<S> {
    fn poll(&self) -> Result<PortPoll> {
        let mut sockets = self.scanner.scan()?;
        if !self.include_localhost {
            sockets.retain(|s| !s.is_loopback());
        }

        let mut previous = self.previous.lock();
        let changed = previous.as_ref() != Some(&sockets);
        if changed {
            *previous = Some(sockets.clone());
        }

        Ok(PortPoll { sockets, changed })
    }
}
