//! Linux port scanner implementation reading procfs.
//!
//! Sockets come from `/proc/net/{tcp,tcp6,udp,udp6}`; owners are found by
//! matching socket inodes against the `/proc/<pid>/fd` symlinks.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::domain::{ListeningSocket, Protocol};
use crate::error::Result;

use super::utils::Utils;
use super::Scanner;

/// `st` column value for a TCP socket in LISTEN state.
const TCP_LISTEN: &str = "0A";

/// Linux-specific port scanner.
pub struct LinuxScanner {
    proc_root: PathBuf,
}

/// One row of a `/proc/net` socket table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SocketRow {
    protocol: Protocol,
    ip: IpAddr,
    port: u16,
    inode: u64,
}

impl LinuxScanner {
    /// Create a new Linux scanner reading `/proc`.
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Create a scanner over an alternative procfs mount (for testing).
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Read every socket table, skipping the IPv6 ones when the kernel lacks them.
    fn read_rows(&self) -> Result<Vec<SocketRow>> {
        let tables = [
            ("tcp", Protocol::Tcp, true),
            ("tcp6", Protocol::Tcp, false),
            ("udp", Protocol::Udp, false),
            ("udp6", Protocol::Udp, false),
        ];

        let mut rows = Vec::new();
        for (name, protocol, required) in tables {
            let path = self.proc_root.join("net").join(name);
            match fs::read_to_string(&path) {
                Ok(content) => rows.extend(Self::parse_net_table(&content, protocol)),
                Err(e) if !required && e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(rows)
    }

    /// Parse a `/proc/net` socket table into listening rows.
    ///
    /// Expected format (header line first):
    /// ```text
    ///   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
    ///    0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 31337 1 ...
    /// ```
    ///
    /// TCP rows count when in LISTEN state, UDP rows when they have no peer.
    fn parse_net_table(content: &str, protocol: Protocol) -> Vec<SocketRow> {
        let mut rows = Vec::new();

        for line in content.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                continue;
            }

            let Some((ip, port)) = Utils::parse_hex_endpoint(fields[1]) else {
                continue;
            };
            if port == 0 {
                continue;
            }

            let listening = match protocol {
                Protocol::Tcp => fields[3] == TCP_LISTEN,
                Protocol::Udp => matches!(Utils::parse_hex_endpoint(fields[2]), Some((_, 0))),
            };
            if !listening {
                continue;
            }

            let inode: u64 = match fields[9].parse() {
                Ok(i) => i,
                Err(_) => continue,
            };

            rows.push(SocketRow {
                protocol,
                ip,
                port,
                inode,
            });
        }

        rows
    }

    /// Extract the inode from an fd symlink target like `socket:[31337]`.
    fn parse_socket_link(target: &str) -> Option<u64> {
        target
            .strip_prefix("socket:[")?
            .strip_suffix(']')?
            .parse()
            .ok()
    }

    /// Map the wanted socket inodes to their owning (pid, process name).
    ///
    /// Processes whose fd table cannot be read (other users, races with
    /// exiting processes) are skipped.
    fn socket_owners(&self, wanted: &HashSet<u64>) -> HashMap<u64, (u32, String)> {
        let mut owners = HashMap::new();
        if wanted.is_empty() {
            return owners;
        }

        let Ok(entries) = fs::read_dir(&self.proc_root) else {
            return owners;
        };

        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };

            let Ok(fds) = fs::read_dir(entry.path().join("fd")) else {
                continue;
            };

            let mut name: Option<String> = None;
            for fd in fds.flatten() {
                let Ok(target) = fs::read_link(fd.path()) else {
                    continue;
                };
                let Some(inode) = target.to_str().and_then(Self::parse_socket_link) else {
                    continue;
                };
                if !wanted.contains(&inode) || owners.contains_key(&inode) {
                    continue;
                }

                let name = name
                    .get_or_insert_with(|| Self::process_name(&entry.path()))
                    .clone();
                owners.insert(inode, (pid, name));
            }

            if owners.len() == wanted.len() {
                break;
            }
        }

        owners
    }

    fn process_name(pid_dir: &Path) -> String {
        fs::read_to_string(pid_dir.join("comm"))
            .map(|comm| comm.trim_end().to_string())
            .unwrap_or_default()
    }

    /// Join rows with their owners, deduplicate and sort.
    fn build_sockets(
        rows: Vec<SocketRow>,
        owners: &HashMap<u64, (u32, String)>,
    ) -> Vec<ListeningSocket> {
        let mut sockets = Vec::new();
        let mut seen: HashSet<(Protocol, u16, u32)> = HashSet::new();

        for row in rows {
            let (pid, process_name) = owners
                .get(&row.inode)
                .cloned()
                .unwrap_or_else(|| (0, String::new()));

            // Dual-stack listeners show up in both tcp and tcp6
            if !seen.insert((row.protocol, row.port, pid)) {
                continue;
            }

            sockets.push(ListeningSocket::new(
                row.port,
                row.protocol,
                pid,
                process_name,
                Utils::display_ip(&row.ip),
            ));
        }

        sockets.sort_by_key(|s| s.sort_key());
        sockets
    }
}

impl Default for LinuxScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for LinuxScanner {
    fn scan(&self) -> Result<Vec<ListeningSocket>> {
        let rows = self.read_rows()?;
        let wanted: HashSet<u64> = rows.iter().map(|r| r.inode).filter(|i| *i != 0).collect();
        let owners = self.socket_owners(&wanted);
        Ok(Self::build_sockets(rows, &owners))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::os::unix::fs::symlink;

    const TCP_TABLE: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 31337 1 0000000000000000 100 0 0 10 0
   1: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1111 1 0000000000000000 100 0 0 10 0
   2: 0100007F:A0B2 0100007F:1F90 01 00000000:00000000 00:00000000 00000000  1000        0 2222 1 0000000000000000 20 4 30 10 -1
";

    const UDP_TABLE: &str = "   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  100: 00000000:14E9 00000000:0000 07 00000000:00000000 00:00000000 00000000   100        0 4444 2 0000000000000000 0
  101: 0100007F:9C40 0100007F:0035 01 00000000:00000000 00:00000000 00000000  1000        0 5555 2 0000000000000000 0
";

    #[test]
    fn test_parse_tcp_table_keeps_only_listeners() {
        let rows = LinuxScanner::parse_net_table(TCP_TABLE, Protocol::Tcp);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].port, 8080);
        assert_eq!(rows[0].ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(rows[0].inode, 31337);

        assert_eq!(rows[1].port, 22);
        assert!(rows[1].ip.is_unspecified());
    }

    #[test]
    fn test_parse_udp_table_skips_connected_sockets() {
        let rows = LinuxScanner::parse_net_table(UDP_TABLE, Protocol::Udp);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].port, 5353);
        assert_eq!(rows[0].protocol, Protocol::Udp);
    }

    #[test]
    fn test_parse_socket_link() {
        assert_eq!(LinuxScanner::parse_socket_link("socket:[31337]"), Some(31337));
        assert_eq!(LinuxScanner::parse_socket_link("pipe:[31337]"), None);
        assert_eq!(LinuxScanner::parse_socket_link("/dev/null"), None);
    }

    #[test]
    fn test_build_sockets_deduplicates_dual_stack() {
        let rows = vec![
            SocketRow {
                protocol: Protocol::Tcp,
                ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                port: 3000,
                inode: 1,
            },
            SocketRow {
                protocol: Protocol::Tcp,
                ip: IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
                port: 3000,
                inode: 2,
            },
        ];
        let mut owners = HashMap::new();
        owners.insert(1, (1234, "node".to_string()));
        owners.insert(2, (1234, "node".to_string()));

        let sockets = LinuxScanner::build_sockets(rows, &owners);
        assert_eq!(sockets.len(), 1);
        assert_eq!(sockets[0].address, "*");
    }

    #[test]
    fn test_scan_fake_procfs() {
        let root = tempfile::tempdir().unwrap();
        let net = root.path().join("net");
        fs::create_dir_all(&net).unwrap();
        fs::write(net.join("tcp"), TCP_TABLE).unwrap();
        fs::write(net.join("udp"), UDP_TABLE).unwrap();

        let proc_dir = root.path().join("4242");
        fs::create_dir_all(proc_dir.join("fd")).unwrap();
        fs::write(proc_dir.join("comm"), "vite\n").unwrap();
        symlink("socket:[31337]", proc_dir.join("fd").join("7")).unwrap();
        symlink("/dev/null", proc_dir.join("fd").join("0")).unwrap();

        let scanner = LinuxScanner::with_root(root.path());
        let sockets = scanner.scan().unwrap();

        // Sorted by port: 22 (unknown owner), 5353/udp, 8080 (vite)
        assert_eq!(sockets.len(), 3);
        assert_eq!(sockets[0].port, 22);
        assert_eq!(sockets[0].pid, 0);
        assert_eq!(sockets[1].port, 5353);
        assert_eq!(sockets[1].protocol, Protocol::Udp);
        assert_eq!(sockets[2].port, 8080);
        assert_eq!(sockets[2].pid, 4242);
        assert_eq!(sockets[2].process_name, "vite");
    }

    #[test]
    fn test_scan_requires_tcp_table() {
        let root = tempfile::tempdir().unwrap();
        let scanner = LinuxScanner::with_root(root.path());
        assert!(scanner.scan().is_err());
    }
}
