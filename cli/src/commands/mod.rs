//! Subcommand implementations.

pub mod config;
pub mod ports;
pub mod serve;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use portdisco_core::{ConfigStore, RelayConfig};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins unless `-v` was given; stdout stays free for the
/// server details.
pub fn init_logging(verbose: bool, logfile: Option<&Path>) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let (writer, ansi) = match logfile {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("could not open log file {}", path.display()))?;
            (BoxMakeWriter::new(Arc::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))
}

/// The config file's contents, or defaults when there is no home directory.
pub async fn load_config() -> Result<RelayConfig> {
    match ConfigStore::new() {
        Ok(store) => Ok(store.load().await?),
        Err(e) => {
            tracing::warn!(error = %e, "using default configuration");
            Ok(RelayConfig::default())
        }
    }
}
