//! The record store the engine persists snapshots through
//!
//! The engine needs ordered, filtered reads plus a handful of delete shapes.
//! Everything is scoped to one owner: an implementation must never return or
//! delete rows belonging to another record.

use rewind_core_types::OwnerKey;

use crate::errors::Result;
use crate::scope::{SnapshotFilter, SnapshotQuery};
use crate::snapshot::{NewSnapshot, Snapshot};

/// Which of an owner's rows a delete removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    /// One row by id, whatever its kept flag or window position
    Id(i64),
    /// Every row, kept ones only when `include_kept`
    All { include_kept: bool },
    /// Every candidate of the filter that the filter's window does not admit
    OutsideWindow(SnapshotFilter),
}

/// Persistence collaborator for snapshots
pub trait SnapshotRepository {
    /// Write a new row and return it with its assigned id
    ///
    /// # Errors
    ///
    /// `Persistence` or `Serialization` when the row cannot be written.
    fn insert(&mut self, snapshot: NewSnapshot) -> Result<Snapshot>;

    /// Rows of `owner` matching `query`, in the query's output order
    ///
    /// # Errors
    ///
    /// `Persistence` or `Serialization` when rows cannot be read back.
    fn select(&self, owner: &OwnerKey, query: &SnapshotQuery) -> Result<Vec<Snapshot>>;

    /// Number of rows of `owner` inside the filter's window
    ///
    /// # Errors
    ///
    /// `Persistence` when the store cannot be queried.
    fn count(&self, owner: &OwnerKey, filter: &SnapshotFilter) -> Result<u64>;

    /// Whether the filter's window holds any row of `owner`
    ///
    /// # Errors
    ///
    /// `Persistence` when the store cannot be queried.
    fn exists(&self, owner: &OwnerKey, filter: &SnapshotFilter) -> Result<bool> {
        Ok(self.count(owner, filter)? > 0)
    }

    /// Remove rows of `owner` and return how many went away
    ///
    /// # Errors
    ///
    /// `Persistence` when the delete fails.
    fn delete(&mut self, owner: &OwnerKey, scope: &DeleteScope) -> Result<u64>;
}
