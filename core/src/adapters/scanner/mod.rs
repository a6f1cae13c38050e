//! Port scanner adapters.
//!
//! Platform-specific implementations of socket enumeration, plus the
//! change-detecting [`PortPoller`] that exposes them as a `PortEnumerator`.

#[cfg(target_os = "macos")]
mod darwin;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

mod poller;
mod utils;

pub use poller::PortPoller;

use crate::domain::ListeningSocket;
use crate::error::Result;

/// The main port scanner that uses platform-specific implementations.
pub struct PortScanner {
    #[cfg(target_os = "macos")]
    inner: darwin::DarwinScanner,

    #[cfg(target_os = "linux")]
    inner: linux::LinuxScanner,

    #[cfg(target_os = "windows")]
    inner: windows::WindowsScanner,
}

impl PortScanner {
    /// Create a new port scanner for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "macos")]
            inner: darwin::DarwinScanner::new(),

            #[cfg(target_os = "linux")]
            inner: linux::LinuxScanner::new(),

            #[cfg(target_os = "windows")]
            inner: windows::WindowsScanner::new(),
        }
    }

    /// Enumerate all listening TCP and bound UDP sockets.
    pub fn scan(&self) -> Result<Vec<ListeningSocket>> {
        self.inner.scan()
    }
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for PortScanner {
    fn scan(&self) -> Result<Vec<ListeningSocket>> {
        self.inner.scan()
    }
}

/// Trait for platform-specific implementations.
///
/// Results are sorted by port so consecutive scans compare equal when
/// nothing changed.
pub trait Scanner: Send + Sync {
    fn scan(&self) -> Result<Vec<ListeningSocket>>;
}
