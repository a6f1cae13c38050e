//! PortDisco CLI - Announce newly opened ports to a connected client
//!
//! Runs the port discovery relay by default, and offers a couple of
//! one-shot commands for inspecting what it would see.

mod commands;

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "portdisco")]
#[command(author, version, about = "Announce newly opened ports to a connected client")]
#[command(propagate_version = true, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    logfile: Option<PathBuf>,
}

/// Options for running the relay.
#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Port to listen on (0 picks a free one)
    #[arg(long, default_value_t = 0)]
    pub port: u16,

    /// Address to bind (overrides the config file)
    #[arg(long, value_name = "IP")]
    pub bind: Option<IpAddr>,

    /// Nonce clients must present as their Basic auth user (random if omitted)
    #[arg(long)]
    pub nonce: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the port discovery relay (default)
    Serve(ServeArgs),

    /// List listening sockets once
    #[command(alias = "ls")]
    Ports {
        /// Filter by port number
        #[arg(short, long)]
        port: Option<u16>,

        /// Filter by process name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Only show TCP listeners
        #[arg(long)]
        tcp_only: bool,
    },

    /// Show current configuration
    Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::init_logging(cli.verbose, cli.logfile.as_deref())
        .context("failed to initialize logging")?;

    match cli.command {
        Some(Commands::Serve(args)) => commands::serve::run(args).await?,
        Some(Commands::Ports {
            port,
            name,
            tcp_only,
        }) => {
            commands::ports::run(port, name, tcp_only, cli.json).await?;
        }
        Some(Commands::Config) => {
            commands::config::show(cli.json).await?;
        }
        None => commands::serve::run(cli.serve).await?,
    }

    Ok(())
}
