//! Identifier of a remote record within its entity type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier of a record within one entity type.
///
/// The CRM hands out integer ids per collection, so the same numeric value
/// may appear in two different types. Uniqueness only holds per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }

    /// Reads an id out of a JSON value.
    ///
    /// Accepts integers and strings holding an integer; everything else is
    /// rejected with `field` named in the error.
    pub fn from_json(field: &str, value: &serde_json::Value) -> crate::Result<Self> {
        let invalid = || crate::Error::InvalidField {
            field: field.to_string(),
            value: value.to_string(),
        };
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self).ok_or_else(invalid),
            serde_json::Value::String(s) => s.trim().parse().map(Self).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl From<i64> for RecordId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
