//! Binary crate for the `agri` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Human-friendly output formatting

use agri_core::CancelToken;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod output;

const DEFAULT_LOG_FILTER: &str = "agri=info,agri_core=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling outstanding requests");
            on_interrupt.cancel();
        }
    });

    let cmd = cli::Cli::parse();
    cmd.run(cancel).await
}
