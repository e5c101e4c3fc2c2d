//! Polymorphic owner identity
//!
//! Snapshots of many record types share one collection. Each row points back
//! at its record through a type tag plus the record's id.

use serde::{Deserialize, Serialize};

/// Identity of the record that owns a snapshot collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerKey {
    owner_type: String,
    owner_id: String,
}

impl OwnerKey {
    /// Create a key from a type tag and a record id
    pub fn new(owner_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
        }
    }

    /// The type tag used to pick a reconstruction function
    pub fn owner_type(&self) -> &str {
        &self.owner_type
    }

    /// The record's primary id, rendered as a string
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.owner_type, self.owner_id)
    }
}
