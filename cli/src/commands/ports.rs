//! Ports command - show all listening sockets.

use anyhow::Result;
use portdisco_core::PortScanner;

pub async fn run(
    port_filter: Option<u16>,
    name_filter: Option<String>,
    tcp_only: bool,
    json: bool,
) -> Result<()> {
    let mut sockets = tokio::task::spawn_blocking(|| PortScanner::new().scan()).await??;

    // Apply filters
    if let Some(p) = port_filter {
        sockets.retain(|socket| socket.port == p);
    }
    if let Some(ref name) = name_filter {
        let name_lower = name.to_lowercase();
        sockets.retain(|socket| socket.process_name.to_lowercase().contains(&name_lower));
    }
    if tcp_only {
        sockets.retain(|socket| socket.is_tcp());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&sockets)?);
        return Ok(());
    }

    if sockets.is_empty() {
        println!("No listening sockets found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<6} {:<8} {:<20} ADDRESS",
        "PORT", "PROTO", "PID", "PROCESS"
    );
    println!("{}", "-".repeat(64));

    for socket in &sockets {
        let pid = if socket.pid == 0 {
            "-".to_string()
        } else {
            socket.pid.to_string()
        };
        println!(
            "{:<6} {:<6} {:<8} {:<20} {}",
            socket.port,
            socket.protocol,
            pid,
            truncate(&socket.process_name, 20),
            socket.address
        );
    }

    println!("\nTotal: {} sockets", sockets.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}…")
    }
}
