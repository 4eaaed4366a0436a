//! Read access to cached payloads by accessor name.

use crate::error::{SyncError, SyncResult};
use crate::registry::Registry;
use crmcache_storage::{CacheStore, RecordFilter};
use crmcache_types::RecordId;
use std::collections::BTreeMap;

/// Maps accessor names (`leads`, `comments`, ...) to registered type names.
///
/// Built once from the registry; child types are reachable the same way as
/// top-level ones.
#[derive(Debug, Clone, Default)]
pub struct RecordAccessors {
    by_property: BTreeMap<String, String>,
}

impl RecordAccessors {
    pub fn from_registry(registry: &Registry) -> Self {
        let mut by_property = BTreeMap::new();
        for descriptor in registry.descriptors() {
            by_property
                .entry(descriptor.property_name.clone())
                .or_insert_with(|| descriptor.name.clone());
            for child in &descriptor.child_types {
                by_property
                    .entry(child.property_name.clone())
                    .or_insert_with(|| child.name.clone());
            }
        }
        Self { by_property }
    }

    /// Accessor names, sorted.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.by_property.keys().map(String::as_str)
    }

    /// Type name behind an accessor.
    pub fn type_name(&self, property: &str) -> Option<&str> {
        self.by_property.get(property).map(String::as_str)
    }

    fn resolve(&self, property: &str) -> SyncResult<&str> {
        self.type_name(property)
            .ok_or_else(|| SyncError::UnknownEntityType(property.to_string()))
    }

    /// Every cached payload of the type, ordered by id.
    pub fn all<S: CacheStore>(
        &self,
        store: &S,
        property: &str,
    ) -> SyncResult<Vec<serde_json::Value>> {
        let type_name = self.resolve(property)?;
        Ok(store
            .query(type_name, RecordFilter::All)?
            .into_iter()
            .map(|r| r.payload)
            .collect())
    }

    /// One cached payload.
    pub fn by_id<S: CacheStore>(
        &self,
        store: &S,
        property: &str,
        uid: RecordId,
    ) -> SyncResult<Option<serde_json::Value>> {
        let type_name = self.resolve(property)?;
        Ok(store.get(type_name, uid)?.map(|r| r.payload))
    }
}
