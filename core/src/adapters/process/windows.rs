//! Windows process table placeholder.

use crate::domain::Lineage;
use crate::error::{Error, Result};

pub struct WindowsProcessTable;

impl WindowsProcessTable {
    pub fn new() -> Self {
        Self
    }

    pub fn parent_of(&self, _pid: u32) -> Result<Lineage> {
        Err(Error::UnsupportedPlatform(
            "Windows process ancestry is not implemented".to_string(),
        ))
    }
}
