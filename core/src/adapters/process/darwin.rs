//! macOS process table backed by `ps`.

use std::process::{Command, Stdio};

use crate::domain::Lineage;
use crate::error::{Error, Result};

pub struct DarwinProcessTable;

impl DarwinProcessTable {
    pub fn new() -> Self {
        Self
    }

    /// Executes: `ps -o ppid= -p <pid>`
    pub fn parent_of(&self, pid: u32) -> Result<Lineage> {
        let output = Command::new("/bin/ps")
            .args(["-o", "ppid=", "-p", &pid.to_string()])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| Error::CommandFailed(format!("Failed to run ps: {}", e)))?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in ps output: {}", e)))?;

        Self::parse_ps_output(&stdout, output.status.success())
    }

    /// ps exits non-zero with no output when the pid does not exist.
    fn parse_ps_output(stdout: &str, success: bool) -> Result<Lineage> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return if success {
                Err(Error::ParseError("Empty ps output".to_string()))
            } else {
                Ok(Lineage::NotFound)
            };
        }

        let ppid: u32 = trimmed
            .parse()
            .map_err(|e| Error::ParseError(format!("Invalid ppid {:?}: {}", trimmed, e)))?;
        Ok(Lineage::from_ppid(ppid))
    }
}
