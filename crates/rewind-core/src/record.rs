//! The record side of the contract
//!
//! A record is any mutable, identifiable entity that can export its
//! attributes into a snapshot and take them back. The engine never owns
//! records; it borrows them for the duration of an operation.

use std::any::Any;
use std::collections::HashMap;

use rewind_core_types::OwnerKey;

use crate::context::RewindContext;
use crate::errors::RewindError;
use crate::limits::RetentionPolicy;
use crate::repository::SnapshotRepository;
use crate::rewind::Rewind;
use crate::snapshot::{AttributeMap, Snapshot};

/// Raw attribute access used by the default export/import hooks
///
/// The defaults copy attributes verbatim: restoring a snapshot through
/// `set_raw_attributes` skips whatever validation or casting the record
/// normally applies to its fields. Override `Rewindable::import_attributes`
/// when restored data must go through those checks.
pub trait RawAttributes {
    fn raw_attributes(&self) -> AttributeMap;

    fn set_raw_attributes(&mut self, attributes: AttributeMap);
}

/// A record whose states can be captured and restored
pub trait Rewindable: RawAttributes + Sized {
    /// Type tag stored next to every snapshot of this record type
    const OWNER_TYPE: &'static str;

    /// Primary id of this record
    fn owner_id(&self) -> String;

    /// A blank instance, filled by `import_attributes` on reconstruction
    fn new_instance() -> Self;

    fn owner_key(&self) -> OwnerKey {
        OwnerKey::new(Self::OWNER_TYPE, self.owner_id())
    }

    /// Attributes written into each snapshot
    fn export_attributes(&self) -> AttributeMap {
        self.raw_attributes()
    }

    /// Take attributes from a restored snapshot
    fn import_attributes(&mut self, attributes: AttributeMap) {
        self.set_raw_attributes(attributes);
    }

    /// Re-evaluated on every query, never cached
    fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::default()
    }

    fn snapshot_on_create(&self) -> bool {
        true
    }

    fn snapshot_on_update(&self) -> bool {
        true
    }

    fn prune_on_update(&self) -> bool {
        true
    }

    /// Whether the snapshot taken on create is exempt from pruning
    fn keep_first_snapshot(&self) -> bool {
        false
    }

    /// Build a detached record from snapshot data
    fn from_snapshot_data(data: AttributeMap) -> Self {
        let mut record = Self::new_instance();
        record.import_attributes(data);
        record
    }

    /// Snapshot operations bound to this record
    fn rewind<'a, S>(&'a mut self, repo: &'a mut S, ctx: &'a RewindContext) -> Rewind<'a, Self, S>
    where
        S: SnapshotRepository + ?Sized,
    {
        Rewind::new(self, repo, ctx)
    }
}

/// A reconstructed record whose concrete type is only known by its tag
pub trait DynRecord: Any {
    fn owner_type(&self) -> &'static str;

    fn attributes(&self) -> AttributeMap;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<R: Rewindable + 'static> DynRecord for R {
    fn owner_type(&self) -> &'static str {
        R::OWNER_TYPE
    }

    fn attributes(&self) -> AttributeMap {
        self.export_attributes()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

type Reconstruct = fn(AttributeMap) -> Box<dyn DynRecord>;

fn reconstruct<R: Rewindable + 'static>(data: AttributeMap) -> Box<dyn DynRecord> {
    Box::new(R::from_snapshot_data(data))
}

/// Maps owner type tags to reconstruction functions
///
/// Lets a caller materialize any snapshot row without knowing its record type
/// at compile time.
#[derive(Default)]
pub struct OwnerRegistry {
    entries: HashMap<&'static str, Reconstruct>,
}

impl OwnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `R` under its `OWNER_TYPE`; a later registration for the same
    /// tag replaces the earlier one
    pub fn register<R: Rewindable + 'static>(&mut self) -> &mut Self {
        self.entries.insert(R::OWNER_TYPE, reconstruct::<R>);
        self
    }

    pub fn with<R: Rewindable + 'static>(mut self) -> Self {
        self.register::<R>();
        self
    }

    pub fn is_registered(&self, owner_type: &str) -> bool {
        self.entries.contains_key(owner_type)
    }

    /// Reconstruct the record a snapshot was taken from
    ///
    /// # Errors
    ///
    /// `UnregisteredOwnerType` when the row's tag has no entry.
    pub fn instantiate(&self, snapshot: &Snapshot) -> Result<Box<dyn DynRecord>, RewindError> {
        let owner_type = snapshot.owner.owner_type();
        let build = self
            .entries
            .get(owner_type)
            .ok_or_else(|| RewindError::UnregisteredOwnerType {
                owner_type: owner_type.to_string(),
            })?;
        Ok(build(snapshot.data.clone()))
    }
}

impl std::fmt::Debug for OwnerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.entries.keys().collect();
        tags.sort();
        f.debug_struct("OwnerRegistry").field("owner_types", &tags).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Note {
        attributes: AttributeMap,
    }

    impl RawAttributes for Note {
        fn raw_attributes(&self) -> AttributeMap {
            self.attributes.clone()
        }

        fn set_raw_attributes(&mut self, attributes: AttributeMap) {
            self.attributes = attributes;
        }
    }

    impl Rewindable for Note {
        const OWNER_TYPE: &'static str = "note";

        fn owner_id(&self) -> String {
            self.attributes
                .get("id")
                .map(|v| v.to_string())
                .unwrap_or_default()
        }

        fn new_instance() -> Self {
            Note::default()
        }
    }

    fn snapshot(owner_type: &str, data: serde_json::Value) -> Snapshot {
        Snapshot {
            id: 1,
            owner: OwnerKey::new(owner_type, "1"),
            data: data.as_object().cloned().unwrap(),
            is_kept: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_defaults() {
        let note = Note::default();
        assert_eq!(note.retention_policy(), RetentionPolicy::Count(10));
        assert!(note.snapshot_on_create());
        assert!(note.snapshot_on_update());
        assert!(note.prune_on_update());
        assert!(!note.keep_first_snapshot());
    }

    #[test]
    fn test_from_snapshot_data_replaces_attributes() {
        let data = json!({"id": 1, "text": "hi"}).as_object().cloned().unwrap();
        let note = Note::from_snapshot_data(data.clone());
        assert_eq!(note.attributes, data);
        assert_eq!(note.owner_key(), OwnerKey::new("note", "1"));
    }

    #[test]
    fn test_registry_instantiates_by_tag() {
        let registry = OwnerRegistry::new().with::<Note>();
        let record = registry
            .instantiate(&snapshot("note", json!({"text": "restored"})))
            .unwrap();

        assert_eq!(record.owner_type(), "note");
        let note = record.into_any().downcast::<Note>().unwrap();
        assert_eq!(note.attributes["text"], json!("restored"));
    }

    #[test]
    fn test_registry_rejects_unknown_tag() {
        let registry = OwnerRegistry::new().with::<Note>();
        let err = match registry.instantiate(&snapshot("invoice", json!({}))) {
            Ok(record) => panic!("unexpected record of type {}", record.owner_type()),
            Err(err) => err,
        };
        assert_eq!(
            err,
            RewindError::UnregisteredOwnerType {
                owner_type: "invoice".to_string()
            }
        );
        assert!(!registry.is_registered("invoice"));
    }
}
