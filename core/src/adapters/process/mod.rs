//! Process table adapters.
//!
//! Platform-specific parent lookups behind the `AncestryResolver` port.

#[cfg(target_os = "macos")]
mod darwin;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

use crate::domain::Lineage;
use crate::error::Result;
use crate::ports::AncestryResolver;

/// Reads parent ids from the host's process table.
pub struct ProcessTable {
    #[cfg(target_os = "macos")]
    inner: darwin::DarwinProcessTable,

    #[cfg(target_os = "linux")]
    inner: linux::LinuxProcessTable,

    #[cfg(target_os = "windows")]
    inner: windows::WindowsProcessTable,
}

impl ProcessTable {
    /// Create a process table reader for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "macos")]
            inner: darwin::DarwinProcessTable::new(),

            #[cfg(target_os = "linux")]
            inner: linux::LinuxProcessTable::new(),

            #[cfg(target_os = "windows")]
            inner: windows::WindowsProcessTable::new(),
        }
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AncestryResolver for ProcessTable {
    fn parent_of(&self, pid: u32) -> Result<Lineage> {
        self.inner.parent_of(pid)
    }
}
