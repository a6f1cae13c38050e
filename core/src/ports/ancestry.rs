//! Process ancestry resolver port (interface).

use crate::domain::Lineage;
use crate::error::Result;

/// Port for walking the OS process tree upward.
pub trait AncestryResolver: Send + Sync {
    /// Look up the parent of `pid`.
    ///
    /// Returns [`Lineage::NotFound`] for an unknown pid and
    /// [`Lineage::Root`] when the process has no parent.
    fn parent_of(&self, pid: u32) -> Result<Lineage>;
}
