//! Incremental pull-sync engine for crmcache.
//!
//! Keeps a local cache of CRM records consistent with the remote API while
//! fetching as little as possible.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Registry**: Registered entity types, configuration and the per-run
//!   rescan budget
//! - **Fetcher**: Abstracts over the remote API (`HttpFetcher` for the real one)
//! - **Engine**: Pages through every type and reconciles records
//! - **Cascade**: Loads dependent collections of changed parents
//! - **Sweeper**: Drains left-over rescans and prunes unconfirmed records
//! - **Marks**: Operator-triggered rescan marking
//!
//! ## Sync Process
//!
//! 1. **Filter**: Full pass, or quickscan since the type's last pass minus a day
//! 2. **Page**: Fetch pages until `skip` reaches the total count
//! 3. **Reconcile**: Create, update, rescan or ignore every record
//! 4. **Cascade**: Reconcile children of created, updated and rescanned records
//! 5. **Sweep**: Re-fetch left-over rescan records by id, budget permitting
//! 6. **Prune**: Delete records not confirmed upstream
//!
//! # Example
//!
//! ```
//! use crmcache_sync::{SyncConfig, SyncManager, crm_registry};
//!
//! let config = SyncConfig {
//!     page_size: 100,
//!     max_rescan_count: 20,
//!     ..Default::default()
//! };
//!
//! let manager = SyncManager::with_registry(config, crm_registry());
//! assert_eq!(manager.registry().len(), 16);
//! assert_eq!(manager.budget().remaining(), 20);
//! ```

mod accessors;
mod cascade;
mod catalog;
mod config;
mod engine;
mod error;
mod fetcher;
pub mod http;
mod marks;
mod registry;
mod report;
mod sweeper;

pub use accessors::RecordAccessors;
pub use catalog::{crm_catalog, crm_registry};
pub use config::{DEFAULT_API_URL, DEFAULT_MAX_RESCAN_COUNT, DEFAULT_PAGE_SIZE, SyncConfig};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use fetcher::{Page, PageWindow, RemoteFetcher};
pub use http::HttpFetcher;
pub use registry::{Registry, RescanBudget, SyncManager};
pub use report::{MarkReport, Outcome, ScanMode, SweepReport, SyncReport, TypeReport};
