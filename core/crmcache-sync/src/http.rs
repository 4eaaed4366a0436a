//! HTTP implementation of [`RemoteFetcher`].
//!
//! Every request authenticates with the API key as basic-auth user name.
//! Status handling:
//! - 200: success, `X-Total-Count` carries the collection size
//! - 404: not found, reported as `Ok(None)`
//! - 408 / 429: rate limited, retried forever with a doubling wait
//! - anything else: [`SyncError::Api`], which aborts the run

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::fetcher::{Page, PageWindow, RemoteFetcher};
use async_trait::async_trait;
use crmcache_types::RecordId;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, trace};

/// Header carrying the size of the requested collection.
pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

/// Joins URL segments, dropping scheme prefixes and stray slashes.
///
/// The result uses `https://` unless `base` explicitly starts with
/// `http://`.
pub fn build_url(base: &str, segments: &[&str]) -> String {
    let scheme = if base.starts_with("http://") {
        "http://"
    } else {
        "https://"
    };
    let strip = |s: &str| {
        s.trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_matches('/')
            .to_string()
    };

    let parts: Vec<String> = std::iter::once(base)
        .chain(segments.iter().copied())
        .map(strip)
        .filter(|s| !s.is_empty())
        .collect();
    format!("{scheme}{}", parts.join("/"))
}

/// Fetches records from the CRM REST API.
pub struct HttpFetcher {
    client: Client,
    api_url: String,
    api_key: String,
    initial_backoff: Duration,
}

struct Response {
    total_count: usize,
    body: serde_json::Value,
}

impl HttpFetcher {
    /// Creates a fetcher from the sync configuration.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .gzip(true)
            .build()
            .map_err(|e| SyncError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            initial_backoff: config.initial_backoff(),
        })
    }

    /// GETs `url`, waiting out rate limiting.
    async fn retrieve(&self, url: &str, query: &[(&str, String)]) -> SyncResult<Option<Response>> {
        let mut backoff = self.initial_backoff;
        loop {
            let response = self
                .client
                .get(url)
                .basic_auth(&self.api_key, Some(""))
                .query(query)
                .send()
                .await
                .map_err(|e| SyncError::Network(format!("request to {url} failed: {e}")))?;

            let status = response.status();
            match status {
                StatusCode::OK => {
                    let total_count = response
                        .headers()
                        .get(TOTAL_COUNT_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse().ok())
                        .unwrap_or(0);
                    let body = response.json().await.map_err(|e| {
                        SyncError::InvalidResponse(format!("failed to parse body of {url}: {e}"))
                    })?;
                    return Ok(Some(Response { total_count, body }));
                }
                StatusCode::NOT_FOUND => {
                    trace!(url, "Not found");
                    return Ok(None);
                }
                StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                    debug!(
                        url,
                        status = status.as_u16(),
                        wait_ms = backoff.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                _ => {
                    return Err(SyncError::Api {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
            }
        }
    }

    fn expect_array(url: &str, body: serde_json::Value) -> SyncResult<Vec<serde_json::Value>> {
        match body {
            serde_json::Value::Array(records) => Ok(records),
            other => Err(SyncError::InvalidResponse(format!(
                "expected a JSON array from {url}, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_page(
        &self,
        api_path: &str,
        window: PageWindow,
        since: Option<&str>,
    ) -> SyncResult<Option<Page>> {
        let mut query = Vec::with_capacity(4);
        let url = match since {
            Some(cutoff) => {
                query.push(("updated_after_utc", cutoff.to_string()));
                build_url(&self.api_url, &[api_path, "Search"])
            }
            None => build_url(&self.api_url, &[api_path]),
        };
        query.push(("skip", window.skip.to_string()));
        query.push(("top", window.top.to_string()));
        query.push(("count_total", "True".to_string()));

        let Some(response) = self.retrieve(&url, &query).await? else {
            return Ok(None);
        };
        Ok(Some(Page {
            total_count: response.total_count,
            records: Self::expect_array(&url, response.body)?,
        }))
    }

    async fn fetch_children(
        &self,
        parent_path: &str,
        parent_uid: RecordId,
        child_path: &str,
    ) -> SyncResult<Option<Vec<serde_json::Value>>> {
        let uid = parent_uid.to_string();
        let url = build_url(&self.api_url, &[parent_path, &uid, child_path]);
        match self.retrieve(&url, &[]).await? {
            Some(response) => Ok(Some(Self::expect_array(&url, response.body)?)),
            None => Ok(None),
        }
    }

    async fn fetch_by_id(
        &self,
        api_path: &str,
        uid: RecordId,
    ) -> SyncResult<Option<serde_json::Value>> {
        let uid = uid.to_string();
        let url = build_url(&self.api_url, &[api_path, &uid]);
        Ok(self.retrieve(&url, &[]).await?.map(|r| r.body))
    }
}
