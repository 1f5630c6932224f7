//! Item identifiers and extracted records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::form_urlencoded::byte_serialize;

/// Composite identifier of an item parsed from a listing page
///
/// Immutable once parsed; the detail URL and the storage key are both derived
/// from these three parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemRef {
    /// Record identifier (`rid` attribute on the listing row)
    pub record_id: String,

    /// Page identifier (`pid` attribute on the listing row)
    pub page_id: String,

    /// Database identifier (`dbid` attribute on the listing row)
    pub db_id: String,
}

impl ItemRef {
    pub fn new(
        record_id: impl Into<String>,
        page_id: impl Into<String>,
        db_id: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            page_id: page_id.into(),
            db_id: db_id.into(),
        }
    }

    /// Returns the stable key used for deduplication and file naming
    pub fn key(&self) -> ItemKey {
        ItemKey(format!("{}-{}-{}", self.record_id, self.page_id, self.db_id))
    }
}

/// Joined form of an [`ItemRef`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(String);

impl ItemKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a file stem safe to use inside a checkpoint directory
    ///
    /// Identifiers come from remote markup, so the key is form-urlencoded:
    /// path separators cannot appear and distinct keys never share a stem.
    pub fn file_stem(&self) -> String {
        byte_serialize(self.0.as_bytes()).collect()
    }
}

impl From<&str> for ItemKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value of a single extracted field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multi(Vec<String>),
}

impl FieldValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multi(_) => None,
        }
    }

    pub fn as_multi(&self) -> Option<&[String]> {
        match self {
            Self::Single(_) => None,
            Self::Multi(values) => Some(values),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multi(values)
    }
}

/// Field name to value mapping extracted from one detail resource
pub type Record = BTreeMap<String, FieldValue>;
