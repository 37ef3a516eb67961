//! mrfscan CLI — machine-readable-file index scanner.
//!
//! Streams a gzip-compressed price-transparency index, enriches eligible
//! plan records over HTTP, and emits the deduplicated set of target-region
//! rate-file URLs.

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
