//! In-process snapshot repository
//!
//! Keeps rows in a `BTreeMap` keyed by id. Not thread-safe; meant for tests
//! and for embedding where durability is not needed.

use std::collections::{BTreeMap, HashSet};

use rewind_core_types::OwnerKey;

use crate::errors::Result;
use crate::repository::{DeleteScope, SnapshotRepository};
use crate::scope::{SnapshotFilter, SnapshotQuery};
use crate::snapshot::{NewSnapshot, Snapshot};

#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    rows: BTreeMap<i64, Snapshot>,
    last_id: i64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row by id across all owners, bypassing every scope
    pub fn get(&self, id: i64) -> Option<&Snapshot> {
        self.rows.get(&id)
    }

    /// Total rows across all owners
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every row id across all owners, ascending
    pub fn ids(&self) -> Vec<i64> {
        self.rows.keys().copied().collect()
    }

    fn owned<'a>(&'a self, owner: &'a OwnerKey) -> impl Iterator<Item = &'a Snapshot> + 'a {
        self.rows.values().filter(move |s| &s.owner == owner)
    }
}

impl SnapshotRepository for MemoryRepository {
    fn insert(&mut self, snapshot: NewSnapshot) -> Result<Snapshot> {
        // Ids are never reused, even after the newest row is deleted.
        self.last_id += 1;
        let row = snapshot.into_snapshot(self.last_id);
        self.rows.insert(row.id, row.clone());
        Ok(row)
    }

    fn select(&self, owner: &OwnerKey, query: &SnapshotQuery) -> Result<Vec<Snapshot>> {
        Ok(query
            .apply(self.owned(owner))
            .into_iter()
            .cloned()
            .collect())
    }

    fn count(&self, owner: &OwnerKey, filter: &SnapshotFilter) -> Result<u64> {
        Ok(filter.select(self.owned(owner)).len() as u64)
    }

    fn delete(&mut self, owner: &OwnerKey, scope: &DeleteScope) -> Result<u64> {
        let doomed: Vec<i64> = match scope {
            DeleteScope::Id(id) => self
                .owned(owner)
                .filter(|s| s.id == *id)
                .map(|s| s.id)
                .collect(),
            DeleteScope::All { include_kept } => self
                .owned(owner)
                .filter(|s| *include_kept || !s.is_kept)
                .map(|s| s.id)
                .collect(),
            DeleteScope::OutsideWindow(filter) => {
                let window: HashSet<i64> =
                    filter.select(self.owned(owner)).iter().map(|s| s.id).collect();
                self.owned(owner)
                    .filter(|s| filter.is_candidate(s) && !window.contains(&s.id))
                    .map(|s| s.id)
                    .collect()
            }
        };

        for id in &doomed {
            self.rows.remove(id);
        }
        Ok(doomed.len() as u64)
    }
}
