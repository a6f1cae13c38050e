//! macOS port scanner implementation using lsof.

use std::collections::HashSet;
use std::process::{Command, Stdio};

use crate::domain::{ListeningSocket, Protocol};
use crate::error::{Error, Result};

use super::utils::Utils;
use super::Scanner;

/// macOS-specific port scanner using lsof.
pub struct DarwinScanner;

impl DarwinScanner {
    /// Create a new macOS scanner.
    pub fn new() -> Self {
        Self
    }

    /// Parse lsof output into listening sockets.
    ///
    /// Expected lsof output format:
    /// ```text
    /// COMMAND    PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
    /// node     34805  code   19u  IPv6 0x3d8015e195af1f3f      0t0  TCP [::1]:3000 (LISTEN)
    /// mDNSResp   412  root    7u  IPv4 0x1234567890abcdef      0t0  UDP *:5353
    /// ```
    fn parse_lsof_output(&self, output: &str) -> Vec<ListeningSocket> {
        let mut sockets = Vec::new();
        let mut seen: HashSet<(Protocol, u16, u32)> = HashSet::new();

        for line in output.lines().skip(1) {
            if line.is_empty() {
                continue;
            }

            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 9 {
                continue;
            }

            let process_name = components[0]
                .replace("\\x20", " ")
                .replace("\\x2f", "/");

            let pid: u32 = match components[1].parse() {
                Ok(p) => p,
                Err(_) => continue,
            };

            let protocol = match components[7] {
                "TCP" => Protocol::Tcp,
                "UDP" => Protocol::Udp,
                _ => continue,
            };

            // Connected UDP sockets print "local->remote"; only bound ones count
            let name = components[8];
            if name.contains("->") {
                continue;
            }

            let (address, port) = match Utils::parse_address(name) {
                Some((a, p)) => (a, p),
                None => continue,
            };

            if !seen.insert((protocol, port, pid)) {
                continue;
            }

            sockets.push(ListeningSocket::new(port, protocol, pid, process_name, address));
        }

        sockets.sort_by_key(|s| s.sort_key());
        sockets
    }
}

impl Default for DarwinScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for DarwinScanner {
    fn scan(&self) -> Result<Vec<ListeningSocket>> {
        let output = Command::new("/usr/sbin/lsof")
            .args(["-iTCP", "-sTCP:LISTEN", "-iUDP", "-P", "-n", "+c", "0"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| Error::CommandFailed(format!("Failed to run lsof: {}", e)))?;

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in lsof output: {}", e)))?;

        Ok(self.parse_lsof_output(&stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lsof_output() {
        let scanner = DarwinScanner::new();

        let output = r#"COMMAND    PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
node     34805  code   19u  IPv6 0x3d8015e195af1f3f      0t0  TCP [::1]:3000 (LISTEN)
nginx        1  root    6u  IPv4 0x1234567890abcdef      0t0  TCP *:80 (LISTEN)
mDNSResp   412  root    7u  IPv4 0x1234567890abcd00      0t0  UDP *:5353
Chrome     900  code   40u  IPv4 0x1234567890abcd11      0t0  UDP 192.168.1.2:61000->8.8.8.8:53
"#;

        let sockets = scanner.parse_lsof_output(output);
        assert_eq!(sockets.len(), 3);
        assert_eq!(sockets[0].port, 80);
        assert_eq!(sockets[1].port, 3000);
        assert_eq!(sockets[1].address, "[::1]");
        assert_eq!(sockets[2].port, 5353);
        assert_eq!(sockets[2].protocol, Protocol::Udp);
    }

    #[test]
    fn test_escaped_process_name() {
        let scanner = DarwinScanner::new();
        let output = r#"COMMAND    PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
Code\x20Helper 500 code 30u IPv4 0x1 0t0 TCP 127.0.0.1:9229 (LISTEN)
"#;

        let sockets = scanner.parse_lsof_output(output);
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].process_name, "Code Helper");
    }
}
