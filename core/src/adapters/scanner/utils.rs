//! Address helpers shared by the platform scanners.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

pub struct Utils;

impl Utils {
    /// Split an lsof `NAME` endpoint into host and port.
    ///
    /// The port follows the last ':'; an IPv6 host keeps its brackets
    /// ("[::1]:3000") and an empty or wildcard host becomes "*".
    #[cfg_attr(not(target_os = "macos"), allow(dead_code))]
    pub fn parse_address(address: &str) -> Option<(String, u16)> {
        let (host, port) = address.rsplit_once(':')?;
        let port = port.parse().ok()?;
        let host = match host {
            "" | "*" => "*",
            h if h.starts_with('[') && !h.ends_with(']') => return None,
            h => h,
        };
        Some((host.to_string(), port))
    }

    /// Parse a procfs hex endpoint ("0100007F:1F90") into an address and port.
    ///
    /// The address is the kernel's in-memory representation: one
    /// little-endian 32-bit word for IPv4, four of them for IPv6.
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    pub fn parse_hex_endpoint(endpoint: &str) -> Option<(IpAddr, u16)> {
        let (addr_hex, port_hex) = endpoint.split_once(':')?;
        let port = u16::from_str_radix(port_hex, 16).ok()?;

        let ip = match addr_hex.len() {
            8 => {
                let word = u32::from_str_radix(addr_hex, 16).ok()?;
                IpAddr::V4(Ipv4Addr::from(word.to_le_bytes()))
            }
            32 => {
                let mut octets = [0u8; 16];
                for (i, chunk) in octets.chunks_mut(4).enumerate() {
                    let word = u32::from_str_radix(&addr_hex[i * 8..i * 8 + 8], 16).ok()?;
                    chunk.copy_from_slice(&word.to_le_bytes());
                }
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            _ => return None,
        };

        Some((ip, port))
    }

    /// Render an IP the way the scanners display bound addresses.
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    pub fn display_ip(ip: &IpAddr) -> String {
        match ip {
            ip if ip.is_unspecified() => "*".to_string(),
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => v4.to_string(),
                None => format!("[{}]", v6),
            },
        }
    }
}
