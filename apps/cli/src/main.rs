//! specmill CLI — post-process annotated spec documents.
//!
//! Renders markdown/HTML spec sources through the annotation pipeline and
//! exports machine-readable conformance assertions.

mod commands;
mod manifest;

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
