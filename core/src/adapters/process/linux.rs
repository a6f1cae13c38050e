//! Linux process table backed by `/proc/<pid>/stat`.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::domain::Lineage;
use crate::error::{Error, Result};

pub struct LinuxProcessTable {
    proc_root: PathBuf,
}

impl LinuxProcessTable {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }

    pub fn parent_of(&self, pid: u32) -> Result<Lineage> {
        let path = self.proc_root.join(pid.to_string()).join("stat");
        let stat = match fs::read_to_string(&path) {
            Ok(stat) => stat,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Lineage::NotFound),
            Err(e) => return Err(e.into()),
        };

        let ppid = Self::parse_ppid(&stat).ok_or_else(|| {
            Error::ParseError(format!("Unexpected format in {}", path.display()))
        })?;
        Ok(Lineage::from_ppid(ppid))
    }

    /// Extract the parent id from a stat line: "pid (comm) state ppid ...".
    ///
    /// comm may itself contain spaces and parentheses, so fields are
    /// counted from the last ')'.
    fn parse_ppid(stat: &str) -> Option<u32> {
        let name_end = stat.rfind(')')?;
        let mut fields = stat.get(name_end + 1..)?.split_whitespace();
        let _state = fields.next()?;
        fields.next()?.parse().ok()
    }
}
