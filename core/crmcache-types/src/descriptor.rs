use crate::{Error, RecordId, parse_remote_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static description of one remote entity type.
///
/// Descriptors are plain data: the sync engine is generic and picks its
/// reconciliation strategy from `update_key` rather than from a type
/// hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Stable type name, also the key of the type's sync marker (e.g. `Lead`).
    pub name: String,
    /// Human label, also what operators pass to `rescan` (e.g. `leads`).
    pub description: String,
    /// Accessor name (e.g. `lead_statuses`).
    pub property_name: String,
    /// Remote collection path (e.g. `Leads`).
    pub api_path: String,
    /// Payload field holding the record id.
    pub uid_key: String,
    /// Payload field used when logging a record.
    pub name_key: String,
    /// Payload field holding the remote modification time. `None` for
    /// primitive (lookup) types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_key: Option<String>,
    /// Dependent collections fetched per parent record, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_types: Vec<EntityDescriptor>,
    /// Whether records of this type take part in rescan marking.
    pub rescan_eligible: bool,
    /// Whether the top-level pass iterates this type. Child-only types are
    /// registered but only ever loaded through a parent.
    pub standalone: bool,
}

/// Reconciliation strategy derived from a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy<'a> {
    /// No remote modification time: every fetch overwrites the cache.
    Primitive,
    /// Remote modification time in `update_key`: only strictly newer data
    /// (or a rescan request) overwrites the cache.
    Main { update_key: &'a str },
}

impl EntityDescriptor {
    fn base(name: &str, description: &str, api_path: &str, uid_key: &str, name_key: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            property_name: description.replace(' ', "_"),
            api_path: api_path.into(),
            uid_key: uid_key.into(),
            name_key: name_key.into(),
            update_key: None,
            child_types: Vec::new(),
            rescan_eligible: true,
            standalone: true,
        }
    }

    /// Shorthand for a lookup type without a modification timestamp.
    pub fn primitive(
        name: &str,
        description: &str,
        api_path: &str,
        uid_key: &str,
        name_key: &str,
    ) -> Self {
        Self::base(name, description, api_path, uid_key, name_key)
    }

    /// Shorthand for a transactional type carrying a modification timestamp.
    pub fn main(
        name: &str,
        description: &str,
        api_path: &str,
        uid_key: &str,
        name_key: &str,
        update_key: &str,
    ) -> Self {
        Self {
            update_key: Some(update_key.into()),
            ..Self::base(name, description, api_path, uid_key, name_key)
        }
    }

    /// Overrides the accessor name derived from the description.
    #[must_use]
    pub fn with_property_name(mut self, property_name: &str) -> Self {
        self.property_name = property_name.into();
        self
    }

    /// Sets the dependent collections loaded for every parent record.
    #[must_use]
    pub fn with_children(mut self, children: Vec<EntityDescriptor>) -> Self {
        self.child_types = children;
        self
    }

    /// Excludes this type from rescan marking.
    #[must_use]
    pub fn without_rescan(mut self) -> Self {
        self.rescan_eligible = false;
        self
    }

    /// Marks this type as loaded only through its parents.
    #[must_use]
    pub fn child_only(mut self) -> Self {
        self.standalone = false;
        self
    }

    /// Returns the reconciliation strategy for this type.
    pub fn strategy(&self) -> SyncStrategy<'_> {
        match self.update_key.as_deref() {
            Some(update_key) => SyncStrategy::Main { update_key },
            None => SyncStrategy::Primitive,
        }
    }

    /// Returns true if this type has dependent collections.
    pub fn has_children(&self) -> bool {
        !self.child_types.is_empty()
    }

    /// Returns true if `needle` names this type by description, property
    /// name or type name (case-insensitive).
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim();
        [&self.description, &self.property_name, &self.name]
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(needle))
    }

    /// Extracts the record id from a remote payload.
    pub fn uid_of(&self, payload: &serde_json::Value) -> crate::Result<RecordId> {
        let value = payload
            .get(&self.uid_key)
            .ok_or_else(|| Error::MissingField(self.uid_key.clone()))?;
        RecordId::from_json(&self.uid_key, value)
    }

    /// Extracts the remote modification time. Returns `Ok(None)` for
    /// primitive types.
    pub fn updated_at_of(
        &self,
        payload: &serde_json::Value,
    ) -> crate::Result<Option<DateTime<Utc>>> {
        let Some(update_key) = self.update_key.as_deref() else {
            return Ok(None);
        };
        let raw = payload
            .get(update_key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::MissingField(update_key.to_string()))?;
        parse_remote_timestamp(raw).map(Some)
    }

    /// Label used in log lines: the `name_key` field when present, the id otherwise.
    pub fn label_of(&self, payload: &serde_json::Value) -> String {
        match payload.get(&self.name_key) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => payload
                .get(&self.uid_key)
                .map(|v| v.to_string())
                .unwrap_or_default(),
            Some(other) => other.to_string(),
        }
    }
}
