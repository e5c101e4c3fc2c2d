//! Snapshot model
//!
//! A snapshot is one immutable capture of a record's attributes. Rows are
//! written once by the repository and afterwards only read or deleted.

use chrono::{DateTime, Utc};
use rewind_core_types::OwnerKey;
use serde::{Deserialize, Serialize};

/// Serialized attributes of a record, exactly as it exported them
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

/// A persisted snapshot row
///
/// `id` is assigned by the repository and grows monotonically, so it alone
/// decides which snapshot is the latest or the oldest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub owner: OwnerKey,
    pub data: AttributeMap,
    pub is_kept: bool,
    pub created_at: DateTime<Utc>,
}

/// A capture request, before the repository assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub owner: OwnerKey,
    pub data: AttributeMap,
    pub is_kept: bool,
    pub created_at: DateTime<Utc>,
}

impl NewSnapshot {
    /// Build the stored row once the repository has picked an id
    pub fn into_snapshot(self, id: i64) -> Snapshot {
        Snapshot {
            id,
            owner: self.owner,
            data: self.data,
            is_kept: self.is_kept,
            created_at: self.created_at,
        }
    }
}

/// Restriction on which captured attributes a restore applies
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Only {
    #[default]
    All,
    Key(String),
    Keys(Vec<String>),
}

impl Only {
    /// Drop every attribute the restriction does not name
    pub fn narrow(&self, mut attributes: AttributeMap) -> AttributeMap {
        match self {
            Only::All => attributes,
            Only::Key(key) => attributes.remove_entry(key).into_iter().collect(),
            Only::Keys(keys) => {
                attributes.retain(|name, _| keys.iter().any(|k| k == name));
                attributes
            }
        }
    }
}

impl From<&str> for Only {
    fn from(key: &str) -> Self {
        Only::Key(key.to_string())
    }
}

impl From<String> for Only {
    fn from(key: String) -> Self {
        Only::Key(key)
    }
}

impl From<&[&str]> for Only {
    fn from(keys: &[&str]) -> Self {
        Only::Keys(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Only {
    fn from(keys: [&str; N]) -> Self {
        Only::Keys(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl From<Vec<String>> for Only {
    fn from(keys: Vec<String>) -> Self {
        Only::Keys(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs() -> AttributeMap {
        json!({"title": "draft", "body": "text", "views": 3})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_only_all_keeps_everything() {
        assert_eq!(Only::All.narrow(attrs()), attrs());
    }

    #[test]
    fn test_only_key_keeps_one() {
        let narrowed = Only::from("title").narrow(attrs());
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed["title"], json!("draft"));
    }

    #[test]
    fn test_only_missing_key_yields_empty() {
        assert!(Only::from("nope").narrow(attrs()).is_empty());
    }

    #[test]
    fn test_only_keys_keeps_named_subset() {
        let narrowed = Only::from(["title", "views", "absent"]).narrow(attrs());
        assert_eq!(narrowed.len(), 2);
        assert!(narrowed.contains_key("views"));
        assert!(!narrowed.contains_key("body"));
    }

    #[test]
    fn test_new_snapshot_keeps_fields() {
        let created_at = Utc::now();
        let snapshot = NewSnapshot {
            owner: OwnerKey::new("article", "1"),
            data: attrs(),
            is_kept: true,
            created_at,
        }
        .into_snapshot(9);

        assert_eq!(snapshot.id, 9);
        assert!(snapshot.is_kept);
        assert_eq!(snapshot.created_at, created_at);
    }
}
