//! crmcache: local cache of a CRM API.
//!
//! Usage:
//!   crmcache init
//!   crmcache sync [--quick]
//!   crmcache rescan [TYPE] [--last-month]
//!   crmcache unmark | reset | status
//!
//! The API key comes from `--api-key`, `CRMCACHE_API_KEY` or the `--config`
//! file. `RUST_LOG` overrides the log level picked by `-v`.

use anyhow::Result;
use clap::Parser;
use crmcache_cli::{Cli, execute, log_filter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.sync_config()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter(config.verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let output = execute(&cli, config).await?;
    print!("{output}");
    Ok(())
}
