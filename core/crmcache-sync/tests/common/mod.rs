#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use crmcache_storage::SqliteCacheStore;
use crmcache_sync::{
    Page, PageWindow, Registry, RemoteFetcher, SyncConfig, SyncEngine, SyncError, SyncManager,
    SyncResult,
};
use crmcache_types::{EntityDescriptor, RecordId};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A request the engine made against the scripted remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Page {
        api_path: String,
        skip: usize,
        top: usize,
        since: Option<String>,
    },
    Children {
        parent_path: String,
        parent_uid: i64,
        child_path: String,
    },
    ById {
        api_path: String,
        uid: i64,
    },
}

#[derive(Default)]
struct Script {
    collections: HashMap<String, Vec<Value>>,
    children: HashMap<(String, i64, String), Vec<Value>>,
    records: HashMap<(String, i64), Value>,
    failing: HashSet<(String, i64)>,
    failing_collections: HashSet<String>,
    total_override: HashMap<String, usize>,
}

/// In-memory remote. Collections are paged by the requested window; a path
/// without a script answers "not found".
#[derive(Default)]
pub struct MockRemote {
    script: Mutex<Script>,
    requests: Mutex<Vec<Request>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_collection(&self, api_path: &str, records: Vec<Value>) {
        self.script
            .lock()
            .unwrap()
            .collections
            .insert(api_path.to_string(), records);
    }

    /// Reports `total` in the count header instead of the collection size.
    pub fn set_total_count(&self, api_path: &str, total: usize) {
        self.script
            .lock()
            .unwrap()
            .total_override
            .insert(api_path.to_string(), total);
    }

    pub fn set_children(
        &self,
        parent_path: &str,
        parent_uid: i64,
        child_path: &str,
        records: Vec<Value>,
    ) {
        self.script.lock().unwrap().children.insert(
            (parent_path.to_string(), parent_uid, child_path.to_string()),
            records,
        );
    }

    pub fn set_record(&self, api_path: &str, uid: i64, record: Value) {
        self.script
            .lock()
            .unwrap()
            .records
            .insert((api_path.to_string(), uid), record);
    }

    /// Makes fetching the record by id fail with a server error.
    pub fn fail_record(&self, api_path: &str, uid: i64) {
        self.script
            .lock()
            .unwrap()
            .failing
            .insert((api_path.to_string(), uid));
    }

    /// Makes every page request for the collection fail with a server error.
    pub fn fail_collection(&self, api_path: &str) {
        self.script
            .lock()
            .unwrap()
            .failing_collections
            .insert(api_path.to_string());
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    pub fn page_requests(&self, api_path: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| matches!(r, Request::Page { api_path: p, .. } if p == api_path))
            .collect()
    }

    pub fn child_requests(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| matches!(r, Request::Children { .. }))
            .collect()
    }

    pub fn by_id_requests(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| matches!(r, Request::ById { .. }))
            .collect()
    }

    fn log(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl RemoteFetcher for MockRemote {
    async fn fetch_page(
        &self,
        api_path: &str,
        window: PageWindow,
        since: Option<&str>,
    ) -> SyncResult<Option<Page>> {
        self.log(Request::Page {
            api_path: api_path.to_string(),
            skip: window.skip,
            top: window.top,
            since: since.map(str::to_string),
        });
        let script = self.script.lock().unwrap();
        if script.failing_collections.contains(api_path) {
            return Err(SyncError::Api {
                status: 500,
                url: format!("mock://{api_path}"),
            });
        }
        let Some(all) = script.collections.get(api_path) else {
            return Ok(None);
        };
        let total_count = script
            .total_override
            .get(api_path)
            .copied()
            .unwrap_or(all.len());
        let records = all.iter().skip(window.skip).take(window.top).cloned().collect();
        Ok(Some(Page {
            total_count,
            records,
        }))
    }

    async fn fetch_children(
        &self,
        parent_path: &str,
        parent_uid: RecordId,
        child_path: &str,
    ) -> SyncResult<Option<Vec<Value>>> {
        self.log(Request::Children {
            parent_path: parent_path.to_string(),
            parent_uid: parent_uid.get(),
            child_path: child_path.to_string(),
        });
        let key = (parent_path.to_string(), parent_uid.get(), child_path.to_string());
        Ok(self.script.lock().unwrap().children.get(&key).cloned())
    }

    async fn fetch_by_id(&self, api_path: &str, uid: RecordId) -> SyncResult<Option<Value>> {
        self.log(Request::ById {
            api_path: api_path.to_string(),
            uid: uid.get(),
        });
        let key = (api_path.to_string(), uid.get());
        let script = self.script.lock().unwrap();
        if script.failing.contains(&key) {
            return Err(SyncError::Api {
                status: 500,
                url: format!("mock://{api_path}/{uid}"),
            });
        }
        Ok(script.records.get(&key).cloned())
    }
}

// ── Fixtures ────────────────────────────────────────────────────

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn lead(uid: i64, title: &str, updated: &str) -> Value {
    json!({"LEAD_ID": uid, "TITLE": title, "DATE_UPDATED_UTC": updated})
}

pub fn project(uid: i64, updated: &str) -> Value {
    json!({
        "PROJECT_ID": uid,
        "PROJECT_NAME": format!("Project {uid}"),
        "DATE_UPDATED_UTC": updated
    })
}

pub fn note(uid: i64, updated: &str) -> Value {
    json!({"NOTE_ID": uid, "TITLE": format!("Note {uid}"), "DATE_UPDATED_UTC": updated})
}

pub fn comment(uid: i64, updated: &str) -> Value {
    json!({"COMMENT_ID": uid, "BODY": format!("Comment {uid}"), "DATE_UPDATED_UTC": updated})
}

pub fn link(uid: i64, name: &str) -> Value {
    json!({"LINK_ID": uid, "OBJECT_NAME": name})
}

pub fn opportunity(uid: i64, updated: &str) -> Value {
    json!({
        "OPPORTUNITY_ID": uid,
        "OPPORTUNITY_NAME": format!("Deal {uid}"),
        "DATE_UPDATED_UTC": updated
    })
}

pub fn lead_status(uid: i64, status: &str) -> Value {
    json!({"LEAD_STATUS_ID": uid, "LEAD_STATUS": status})
}

pub fn comments() -> EntityDescriptor {
    EntityDescriptor::main(
        "Comment",
        "comments",
        "Comments",
        "COMMENT_ID",
        "COMMENT_ID",
        "DATE_UPDATED_UTC",
    )
    .child_only()
}

pub fn opportunity_links() -> EntityDescriptor {
    EntityDescriptor::primitive(
        "OpportunityLinks",
        "opportunity links",
        "Links",
        "LINK_ID",
        "OBJECT_NAME",
    )
    .without_rescan()
    .child_only()
}

/// A small catalog: one primitive type, three main types, a main child and a
/// primitive child.
pub fn test_registry() -> Registry {
    [
        EntityDescriptor::primitive(
            "LeadStatus",
            "lead statuses",
            "LeadStatuses",
            "LEAD_STATUS_ID",
            "LEAD_STATUS",
        ),
        comments(),
        opportunity_links(),
        EntityDescriptor::main("Lead", "leads", "Leads", "LEAD_ID", "TITLE", "DATE_UPDATED_UTC"),
        EntityDescriptor::main(
            "Project",
            "projects",
            "Projects",
            "PROJECT_ID",
            "PROJECT_NAME",
            "DATE_UPDATED_UTC",
        ),
        EntityDescriptor::main("Note", "notes", "Notes", "NOTE_ID", "TITLE", "DATE_UPDATED_UTC")
            .with_children(vec![comments()]),
        EntityDescriptor::main(
            "Opportunity",
            "opportunities",
            "Opportunities",
            "OPPORTUNITY_ID",
            "OPPORTUNITY_NAME",
            "DATE_UPDATED_UTC",
        )
        .with_children(vec![opportunity_links()]),
    ]
    .into_iter()
    .collect()
}

pub fn test_config() -> SyncConfig {
    SyncConfig {
        api_url: "http://crm.test/v3.1".to_string(),
        api_key: "test-key".to_string(),
        page_size: 2,
        max_rescan_count: 20,
        ..Default::default()
    }
}

pub fn engine_with(
    remote: MockRemote,
    config: SyncConfig,
) -> SyncEngine<MockRemote, SqliteCacheStore> {
    let store = SqliteCacheStore::open_in_memory().unwrap();
    SyncEngine::new(SyncManager::with_registry(config, test_registry()), remote, store)
}

pub fn engine(remote: MockRemote) -> SyncEngine<MockRemote, SqliteCacheStore> {
    engine_with(remote, test_config())
}

pub fn id(raw: i64) -> RecordId {
    RecordId::new(raw)
}
