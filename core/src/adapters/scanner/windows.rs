//! Windows port scanner placeholder.

use crate::domain::ListeningSocket;
use crate::error::{Error, Result};

use super::Scanner;

/// Windows-specific port scanner.
pub struct WindowsScanner;

impl WindowsScanner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for WindowsScanner {
    fn scan(&self) -> Result<Vec<ListeningSocket>> {
        Err(Error::UnsupportedPlatform(
            "Windows port enumeration is not implemented".to_string(),
        ))
    }
}
