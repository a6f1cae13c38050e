//! Example: Watch listening sockets and show who owns each new one.
//!
//! Usage:
//!   cargo run --example watch_ports            # poll every 3 seconds
//!   cargo run --example watch_ports -- 1       # poll every second

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use portdisco_core::{AncestryResolver, Lineage, PortEnumerator, PortPoller, ProcessTable};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let secs = env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(3);

    let poller = PortPoller::new(true);
    let processes = ProcessTable::new();
    let mut known: HashSet<(u16, u32)> = HashSet::new();
    let mut first = true;

    println!("Watching listening sockets every {secs}s (Ctrl+C to stop)...\n");

    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    loop {
        ticker.tick().await;

        let poll = match poller.poll() {
            Ok(poll) => poll,
            Err(e) => {
                eprintln!("Error scanning ports: {}", e);
                continue;
            }
        };
        if !poll.changed {
            continue;
        }

        for socket in poll.sockets.iter().filter(|s| s.is_tcp()) {
            if !known.insert((socket.port, socket.pid)) || first {
                continue;
            }
            println!("new: {}", socket);
            println!("     lineage: {}", lineage(&processes, socket.pid));
        }

        if first {
            println!("{} sockets already listening", poll.sockets.len());
            first = false;
        }
    }
}

fn lineage(processes: &ProcessTable, pid: u32) -> String {
    let mut chain = vec![pid.to_string()];
    let mut current = pid;
    for _ in 0..64 {
        match processes.parent_of(current) {
            Ok(Lineage::Parent(ppid)) => {
                chain.push(ppid.to_string());
                current = ppid;
            }
            Ok(Lineage::Root) => break,
            Ok(Lineage::NotFound) => {
                chain.push("?".to_string());
                break;
            }
            Err(e) => {
                chain.push(format!("<{}>", e));
                break;
            }
        }
    }
    chain.join(" <- ")
}
