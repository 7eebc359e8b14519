mod cli;
mod config;
mod console;
mod narration;
mod track;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,roadlore=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    cli::Cli::parse().run().await
}
