//! notegraph CLI: entity resolution and share payloads over a notes vault.
//!
//! Resolves entity mentions against a JSON corpus export and builds bounded
//! share bundles by walking a vault's reference graph.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
