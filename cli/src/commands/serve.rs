//! Serve command - run the port discovery relay until interrupted.

use anyhow::{Context, Result};
use portdisco_core::{generate_nonce, RelayServer};
use tokio::sync::watch;
use tracing::info;

use crate::ServeArgs;

pub async fn run(args: ServeArgs) -> Result<()> {
    let config = super::load_config().await?;
    let ip = match args.bind {
        Some(ip) => ip,
        None => config
            .bind_address
            .parse()
            .with_context(|| format!("invalid bind address {:?}", config.bind_address))?,
    };
    let nonce = args.nonce.unwrap_or_else(generate_nonce);

    let server = RelayServer::bind(ip, args.port, nonce, config)
        .await
        .context("failed to start relay server")?;

    // Clients read this line to learn where to connect.
    println!("{}", serde_json::to_string(&server.details())?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server_task = tokio::spawn(server.serve(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for interrupt")?;
    info!("interrupted, shutting down");
    let _ = shutdown_tx.send(true);

    server_task.await??;
    Ok(())
}
