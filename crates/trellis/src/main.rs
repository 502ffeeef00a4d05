//! Trellis CLI binary.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use trellis::cli::Cli;

/// Main entry point for the trellis CLI.
///
/// Every command is a short sequence of file reads and writes, so a
/// current-thread runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Example: RUST_LOG=trellis=debug,trellis_jsonl=trace trellis ready
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trellis=info,trellis_jsonl=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting trellis CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Trellis CLI completed successfully");
    Ok(())
}
