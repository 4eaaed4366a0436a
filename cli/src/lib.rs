//! Command-line front end for crmcache.
//!
//! Parses arguments, resolves the sync configuration and runs one command
//! against the cache. Commands return their operator-facing output as text
//! so the binary only has to print it.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use crmcache_storage::SqliteCacheStore;
use crmcache_sync::{
    HttpFetcher, MarkReport, ScanMode, SyncConfig, SyncEngine, SyncManager, SyncReport,
    crm_registry,
};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default location of the cache database.
pub const DEFAULT_DATABASE: &str = "crmcache_data/cache.db";

#[derive(Parser, Debug)]
#[command(name = "crmcache")]
#[command(about = "Incremental local cache of a CRM API", version)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache database file
    #[arg(long, global = true, default_value = DEFAULT_DATABASE)]
    pub database: PathBuf,

    /// API key, sent as basic-auth user name
    #[arg(long, global = true, env = "CRMCACHE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Remote API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Records per page
    #[arg(long, global = true)]
    pub page_size: Option<usize>,

    /// Rescans allowed per run
    #[arg(long, global = true)]
    pub max_rescans: Option<u32>,

    /// Increase verbosity (-v status, -vv settings, -vvv records, -vvvv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only fetch the first page of every type
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print reports as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the cache database
    Init,
    /// Pull changes from the remote API
    Sync {
        /// Only fetch records changed since the previous run
        #[arg(long)]
        quick: bool,
    },
    /// Mark records for rescan on the next sync
    Rescan {
        /// Type to mark (e.g. "leads"); every type when omitted
        target: Option<String>,
        /// Only mark records updated during the last month
        #[arg(long)]
        last_month: bool,
    },
    /// Remove all rescan and dirty marks
    Unmark,
    /// Drop and recreate the cache
    Reset,
    /// Show record and flag counts per type
    Status,
}

impl Cli {
    /// Builds the sync configuration: config file first, then flags and
    /// environment on top.
    pub fn sync_config(&self) -> Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SyncConfig::default(),
        };
        if let Some(api_key) = &self.api_key {
            config.api_key = api_key.clone();
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = api_url.clone();
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(max_rescans) = self.max_rescans {
            config.max_rescan_count = max_rescans;
        }
        if self.verbose > 0 {
            config.verbosity = self.verbose.min(4);
        }
        config.debug |= self.debug;
        config.validate()?;
        Ok(config)
    }
}

/// Reads a JSON configuration file. Missing fields take their defaults.
pub fn load_config(path: &Path) -> Result<SyncConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Default log filter for an operator verbosity level.
pub fn log_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 | 3 => "debug",
        _ => "trace",
    }
}

/// Runs one command and returns what should be shown to the operator.
pub async fn execute(cli: &Cli, config: SyncConfig) -> Result<String> {
    info!(database = %cli.database.display(), "Opening cache");
    let store = SqliteCacheStore::open(&cli.database)
        .with_context(|| format!("failed to open cache at {}", cli.database.display()))?;
    let fetcher = HttpFetcher::new(&config)?;
    let manager = SyncManager::with_registry(config, crm_registry());
    let mut engine = SyncEngine::new(manager, fetcher, store);

    match &cli.command {
        Command::Init => {
            engine.init()?;
            Ok(format!("Cache ready at {}\n", cli.database.display()))
        }
        Command::Sync { quick } => {
            if engine.manager().config().api_key.is_empty() {
                bail!("no API key configured; pass --api-key or set CRMCACHE_API_KEY");
            }
            let mode = if *quick { ScanMode::Quick } else { ScanMode::Full };
            let report = engine.sync(mode).await.context("sync failed")?;
            if cli.json {
                Ok(serde_json::to_string_pretty(&report)? + "\n")
            } else {
                Ok(render_sync_report(&report))
            }
        }
        Command::Rescan { target, last_month } => {
            let target = target.as_deref().unwrap_or("");
            let report = if *last_month {
                engine.rescan_last_month(target)?
            } else {
                engine.rescan(target)?
            };
            Ok(render_mark_report("Marked for rescan", &report))
        }
        Command::Unmark => {
            let report = engine.unmark()?;
            Ok(render_mark_report("Removed marks", &report))
        }
        Command::Reset => {
            engine.reset_cache()?;
            Ok(format!("Cache at {} reset\n", cli.database.display()))
        }
        Command::Status => {
            let counts = engine.flag_counts()?;
            if cli.json {
                let mut map = serde_json::Map::new();
                for (name, c) in counts {
                    map.insert(name, serde_json::to_value(c)?);
                }
                return Ok(serde_json::to_string_pretty(&map)? + "\n");
            }
            let mut out = String::new();
            for (name, c) in counts {
                writeln!(
                    out,
                    "{name}: {} records, {} with rescan status ({:.1}%), {} dirty",
                    c.total,
                    c.rescan,
                    c.rescan_percent(),
                    c.dirty
                )?;
            }
            Ok(out)
        }
    }
}

/// One line per type plus sweep and prune results.
pub fn render_sync_report(report: &SyncReport) -> String {
    let mut out = String::new();
    for t in &report.types {
        let _ = writeln!(
            out,
            "{}: {} new, {} updated, {} rescanned, {} unchanged, {} deferred; \
             children {} new, {} updated",
            t.entity_type,
            t.created,
            t.updated + t.refreshed,
            t.rescanned,
            t.ignored,
            t.rescans_deferred,
            t.children_created,
            t.children_updated + t.children_refreshed,
        );
    }
    match report.sweep {
        Some(sweep) => {
            let _ = writeln!(
                out,
                "Rescan sweep: {} rescanned ({} confirmed, {} missing, {} errors)",
                sweep.swept, sweep.confirmed, sweep.missing, sweep.errors
            );
        }
        None => out.push_str("Rescan sweep skipped: rescan budget exhausted\n"),
    }
    match report.pruned {
        Some(pruned) => {
            let _ = writeln!(out, "Pruned {pruned} unconfirmed records");
        }
        None => out.push_str("Pruning deferred to the next run\n"),
    }
    let _ = writeln!(
        out,
        "Rescans used: {} of {}",
        report.budget.consumed(),
        report.budget.max()
    );
    out
}

fn render_mark_report(action: &str, report: &MarkReport) -> String {
    let mut out = String::new();
    for (name, records) in &report.types {
        let _ = writeln!(out, "{action}: {name} ({records})");
    }
    let _ = writeln!(out, "{} records in total", report.total());
    out
}
