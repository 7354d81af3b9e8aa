//! `vox`: command-line client for Vox project libraries.

mod commands;
mod config;
mod output;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use commands::Command;
use config::VoxConfig;

#[derive(Parser, Debug)]
#[command(name = "vox", version, about = "Upload and organize project media in a SharePoint library")]
struct Cli {
    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "vox starting");

    let config = VoxConfig::load()?;
    debug!(site = %config.site, chunk_size = config.chunk_size, "configuration loaded");

    commands::run(cli.command, &config, cli.json).await
}
