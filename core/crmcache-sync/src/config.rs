//! Sync configuration.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default remote API base URL.
pub const DEFAULT_API_URL: &str = "https://api.insight.ly/v3.1/";

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 400;

/// Default number of rescans allowed per run.
pub const DEFAULT_MAX_RESCAN_COUNT: u32 = 100;

/// Configuration for a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Remote API base URL.
    pub api_url: String,
    /// API key, sent as the basic-auth user name.
    pub api_key: String,
    /// Records per page.
    pub page_size: usize,
    /// Operator verbosity, 0 (silent) to 4 (debug).
    pub verbosity: u8,
    /// Only fetch the first page of every type.
    pub debug: bool,
    /// Rescans allowed per run, shared across all types.
    pub max_rescan_count: u32,
    /// First wait after a rate-limited response; doubles on every retry.
    pub initial_backoff_ms: u64,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            verbosity: 0,
            debug: false,
            max_rescan_count: DEFAULT_MAX_RESCAN_COUNT,
            initial_backoff_ms: 100,
            request_timeout_secs: 60,
        }
    }
}

impl SyncConfig {
    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.page_size == 0 {
            return Err(SyncError::Config("page_size must be at least 1".to_string()));
        }
        if self.api_url.trim().is_empty() {
            return Err(SyncError::Config("api_url must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
