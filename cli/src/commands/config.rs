//! Config command - show the effective relay configuration.

use anyhow::Result;
use portdisco_core::ConfigStore;

pub async fn show(json: bool) -> Result<()> {
    let config = super::load_config().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Ok(store) = ConfigStore::new() {
        println!("Config file: {}", store.path().display());
    }
    println!("Poll interval:      {}s", config.poll_interval().as_secs());
    println!("Include localhost:  {}", config.include_localhost);
    println!("Max ancestry depth: {}", config.max_ancestry_depth);
    println!("Bind address:       {}", config.bind_address);
    Ok(())
}
