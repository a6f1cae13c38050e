//! Process ancestry lookup result.

/// What the OS process table says about a process's parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lineage {
    /// The process exists and has this parent.
    Parent(u32),
    /// The process exists but sits at the top of the tree (parent id 0).
    Root,
    /// No such process.
    NotFound,
}

impl Lineage {
    /// Build a lineage from a raw parent id as reported by the OS.
    pub fn from_ppid(ppid: u32) -> Self {
        if ppid == 0 {
            Lineage::Root
        } else {
            Lineage::Parent(ppid)
        }
    }
}
