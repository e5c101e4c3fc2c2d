//! Snapshot store bound to one record
//!
//! `Rewind` is the operations surface: capture, look up, restore, delete,
//! clear and prune the snapshots of a single record. Reads see only the
//! in-window rows of the record's current retention policy. Deletes state
//! explicitly whether they honour the window and the kept exemption.
//!
//! Every operation logs start/end through the logging facility and publishes
//! at most one notification.

#![allow(clippy::result_large_err)]

use std::time::Instant;

use rewind_core_types::OwnerKey;

use crate::context::RewindContext;
use crate::errors::{Result, RewindError};
use crate::events::RewindEvent;
use crate::record::Rewindable;
use crate::repository::{DeleteScope, SnapshotRepository};
use crate::scope::{SnapshotFilter, SnapshotQuery};
use crate::snapshot::{NewSnapshot, Only, Snapshot};
use crate::{log_op_end, log_op_error, log_op_start};

/// Snapshot operations for one live record
pub struct Rewind<'a, R, S>
where
    R: Rewindable,
    S: SnapshotRepository + ?Sized,
{
    record: &'a mut R,
    repo: &'a mut S,
    ctx: &'a RewindContext,
}

/// Wrap `f` in start/end/error log events tagged with the owner
fn observe<T>(op: &'static str, owner: &OwnerKey, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let started = Instant::now();
    log_op_start!(
        op,
        owner_type = owner.owner_type(),
        owner_id = owner.owner_id()
    );

    let result = f().map_err(|err| match err.op() {
        Some(_) => err,
        None => err.with_op(op),
    });
    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => {
            log_op_end!(
                op,
                duration_ms = duration_ms,
                owner_type = owner.owner_type(),
                owner_id = owner.owner_id()
            );
        }
        Err(err) => {
            log_op_error!(
                op,
                err.clone(),
                duration_ms = duration_ms,
                owner_type = owner.owner_type(),
                owner_id = owner.owner_id()
            );
        }
    }
    result
}

impl<'a, R, S> Rewind<'a, R, S>
where
    R: Rewindable,
    S: SnapshotRepository + ?Sized,
{
    pub fn new(record: &'a mut R, repo: &'a mut S, ctx: &'a RewindContext) -> Self {
        Self { record, repo, ctx }
    }

    /// The live record this store is bound to
    pub fn record(&self) -> &R {
        &*self.record
    }

    fn owner(&self) -> OwnerKey {
        self.record.owner_key()
    }

    /// Read window under the record's current policy
    fn window(&self) -> SnapshotFilter {
        SnapshotFilter::in_window(&self.record.retention_policy())
    }

    // ----- capture -----

    /// Push the record's current attributes as a new snapshot
    ///
    /// Returns a detached record rebuilt from the written data. While the
    /// context suspends capturing nothing is written or published and the
    /// returned record is rebuilt from the unsaved data.
    ///
    /// # Errors
    ///
    /// Repository failures from the insert or the follow-up prune.
    pub fn create(&mut self, keep: bool, prune: bool, include_kept: bool) -> Result<R> {
        let owner = self.owner();
        let data = self.record.export_attributes();

        if !self.ctx.capturing_enabled() {
            tracing::debug!(
                owner_type = owner.owner_type(),
                owner_id = owner.owner_id(),
                "capturing suspended; snapshot not written"
            );
            return Ok(R::from_snapshot_data(data));
        }

        observe("create", &owner, || {
            let snapshot = self.repo.insert(NewSnapshot {
                owner: owner.clone(),
                data,
                is_kept: keep,
                created_at: self.ctx.now(),
            })?;
            tracing::debug!(snapshot_id = snapshot.id, is_kept = keep, "snapshot written");

            self.ctx.publish(RewindEvent::SnapshotCreated {
                owner: owner.clone(),
                snapshot: snapshot.clone(),
            });

            if prune {
                self.prune(include_kept)?;
            }
            Ok(R::from_snapshot_data(snapshot.data))
        })
    }

    /// `create` with the usual defaults: unkept, pruning unkept rows
    ///
    /// # Errors
    ///
    /// See [`Rewind::create`].
    pub fn capture(&mut self) -> Result<R> {
        self.create(false, true, false)
    }

    // ----- lookup -----

    fn fetch(
        &mut self,
        op: &'static str,
        query: SnapshotQuery,
        missing: RewindError,
    ) -> Result<Snapshot> {
        let owner = self.owner();
        observe(op, &owner, || {
            let snapshot = self
                .repo
                .select(&owner, &query)?
                .into_iter()
                .next()
                .ok_or(missing)?;

            self.ctx.publish(RewindEvent::SnapshotRetrieved {
                owner: owner.clone(),
                snapshot: snapshot.clone(),
            });
            Ok(snapshot)
        })
    }

    fn fetch_by_id(&mut self, id: i64) -> Result<Snapshot> {
        let query = SnapshotQuery::new(self.window()).with_id(id).first();
        let missing = RewindError::SnapshotNotFound {
            owner: self.owner(),
            snapshot_id: id,
        };
        self.fetch("find", query, missing)
    }

    fn fetch_latest(&mut self) -> Result<Snapshot> {
        let query = SnapshotQuery::new(self.window()).first();
        let missing = RewindError::NoSnapshots { owner: self.owner() };
        self.fetch("find_latest", query, missing)
    }

    fn fetch_oldest(&mut self) -> Result<Snapshot> {
        let query = SnapshotQuery::new(self.window()).ascending().first();
        let missing = RewindError::NoSnapshots { owner: self.owner() };
        self.fetch("find_oldest", query, missing)
    }

    /// Rebuild a detached record from an in-window snapshot
    ///
    /// # Errors
    ///
    /// `NotFound` when the id does not exist for this record or lies outside
    /// the retention window.
    pub fn find(&mut self, id: i64) -> Result<R> {
        self.fetch_by_id(id).map(|s| R::from_snapshot_data(s.data))
    }

    /// # Errors
    ///
    /// `NotFound` when the window is empty.
    pub fn find_latest(&mut self) -> Result<R> {
        self.fetch_latest().map(|s| R::from_snapshot_data(s.data))
    }

    /// Oldest snapshot still inside the window
    ///
    /// # Errors
    ///
    /// `NotFound` when the window is empty.
    pub fn find_oldest(&mut self) -> Result<R> {
        self.fetch_oldest().map(|s| R::from_snapshot_data(s.data))
    }

    // ----- restore -----

    /// Hand snapshot data to the record's import hook
    ///
    /// A full restore passes the captured map as is. A narrowed restore passes
    /// the live raw attributes with the selected keys replaced.
    fn apply(&mut self, snapshot: Snapshot, only: &Only) -> &mut R {
        let attributes = match only {
            Only::All => snapshot.data,
            narrowed => {
                let mut attributes = self.record.raw_attributes();
                attributes.extend(narrowed.narrow(snapshot.data));
                attributes
            }
        };
        self.record.import_attributes(attributes);
        &mut *self.record
    }

    /// Apply a snapshot onto the live record
    ///
    /// # Errors
    ///
    /// Same as [`Rewind::find`]; the record is left untouched on error.
    pub fn to(&mut self, id: i64) -> Result<&mut R> {
        self.to_only(id, Only::All)
    }

    /// Apply only the named attributes of a snapshot onto the live record
    ///
    /// # Errors
    ///
    /// Same as [`Rewind::find`].
    pub fn to_only(&mut self, id: i64, only: impl Into<Only>) -> Result<&mut R> {
        let snapshot = self.fetch_by_id(id)?;
        Ok(self.apply(snapshot, &only.into()))
    }

    /// # Errors
    ///
    /// Same as [`Rewind::find_latest`].
    pub fn to_latest(&mut self) -> Result<&mut R> {
        self.to_latest_only(Only::All)
    }

    /// # Errors
    ///
    /// Same as [`Rewind::find_latest`].
    pub fn to_latest_only(&mut self, only: impl Into<Only>) -> Result<&mut R> {
        let snapshot = self.fetch_latest()?;
        Ok(self.apply(snapshot, &only.into()))
    }

    /// # Errors
    ///
    /// Same as [`Rewind::find_oldest`].
    pub fn to_oldest(&mut self) -> Result<&mut R> {
        self.to_oldest_only(Only::All)
    }

    /// # Errors
    ///
    /// Same as [`Rewind::find_oldest`].
    pub fn to_oldest_only(&mut self, only: impl Into<Only>) -> Result<&mut R> {
        let snapshot = self.fetch_oldest()?;
        Ok(self.apply(snapshot, &only.into()))
    }

    // ----- aggregates -----

    /// In-window rows, newest first
    ///
    /// # Errors
    ///
    /// Repository read failures.
    pub fn snapshots(&self) -> Result<Vec<Snapshot>> {
        self.repo
            .select(&self.owner(), &SnapshotQuery::new(self.window()))
    }

    /// Every in-window snapshot as a detached record, newest first
    ///
    /// # Errors
    ///
    /// Repository read failures.
    pub fn all(&self) -> Result<Vec<R>> {
        Ok(self
            .snapshots()?
            .into_iter()
            .map(|s| R::from_snapshot_data(s.data))
            .collect())
    }

    /// # Errors
    ///
    /// Repository read failures.
    pub fn count(&self) -> Result<u64> {
        self.repo.count(&self.owner(), &self.window())
    }

    /// # Errors
    ///
    /// Repository read failures.
    pub fn exists(&self) -> Result<bool> {
        self.repo.exists(&self.owner(), &self.window())
    }

    /// # Errors
    ///
    /// Repository read failures.
    pub fn missing(&self) -> Result<bool> {
        self.exists().map(|exists| !exists)
    }

    // ----- deletion -----

    /// Delete one snapshot of this record by id
    ///
    /// Ignores the window and the kept flag. Publishes a deletion notice even
    /// when no row matched.
    ///
    /// # Errors
    ///
    /// Repository delete failures.
    pub fn delete(&mut self, id: i64) -> Result<()> {
        let owner = self.owner();
        observe("delete", &owner, || {
            let removed = self.repo.delete(&owner, &DeleteScope::Id(id))?;
            tracing::debug!(snapshot_id = id, deleted_rows = removed, "snapshot deleted");

            self.ctx.publish(RewindEvent::SnapshotDeleted {
                owner: owner.clone(),
                snapshot_id: id,
            });
            Ok(())
        })
    }

    /// Newest or oldest row by raw id order, ignoring the window
    fn raw_edge(&self, query: SnapshotQuery) -> Result<Option<Snapshot>> {
        Ok(self.repo.select(&self.owner(), &query)?.into_iter().next())
    }

    fn delete_edge(&mut self, edge: Option<Snapshot>, include_kept: bool) -> Result<()> {
        match edge {
            Some(snapshot) if !snapshot.is_kept || include_kept => self.delete(snapshot.id),
            _ => Ok(()),
        }
    }

    /// Delete the newest snapshot unless it is kept and kept rows are excluded
    ///
    /// Selection ignores the retention window. The no-op path publishes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Repository failures.
    pub fn delete_latest(&mut self, include_kept: bool) -> Result<()> {
        let edge = self.raw_edge(SnapshotQuery::raw().first())?;
        self.delete_edge(edge, include_kept)
    }

    /// Delete the oldest snapshot unless it is kept and kept rows are excluded
    ///
    /// # Errors
    ///
    /// Repository failures.
    pub fn delete_oldest(&mut self, include_kept: bool) -> Result<()> {
        let edge = self.raw_edge(SnapshotQuery::raw().ascending().first())?;
        self.delete_edge(edge, include_kept)
    }

    /// Delete every snapshot of this record, kept ones only if asked
    ///
    /// # Errors
    ///
    /// Repository delete failures.
    pub fn clear(&mut self, include_kept: bool) -> Result<()> {
        let owner = self.owner();
        observe("clear", &owner, || {
            let removed = self
                .repo
                .delete(&owner, &DeleteScope::All { include_kept })?;
            tracing::debug!(include_kept, deleted_rows = removed, "snapshots cleared");

            self.ctx.publish(RewindEvent::SnapshotsCleared {
                owner: owner.clone(),
                includes_kept: include_kept,
            });
            Ok(())
        })
    }

    /// `clear(true)`
    ///
    /// # Errors
    ///
    /// Repository delete failures.
    pub fn force_clear(&mut self) -> Result<()> {
        self.clear(true)
    }

    /// Delete every snapshot outside the retention window
    ///
    /// Does nothing, and publishes nothing, under an unlimited policy. Without
    /// `include_kept` kept rows neither count toward the window nor get
    /// deleted; with it they compete for the window like any other row.
    ///
    /// # Errors
    ///
    /// Repository delete failures.
    pub fn prune(&mut self, include_kept: bool) -> Result<()> {
        let policy = self.record.retention_policy();
        if policy.is_unlimited() {
            return Ok(());
        }

        let mut filter = SnapshotFilter::in_window(&policy);
        if !include_kept {
            filter = filter.excluding_kept();
        }

        let owner = self.owner();
        observe("prune", &owner, || {
            let removed = self
                .repo
                .delete(&owner, &DeleteScope::OutsideWindow(filter))?;
            tracing::debug!(include_kept, deleted_rows = removed, "snapshots pruned");

            self.ctx.publish(RewindEvent::SnapshotsPruned {
                owner: owner.clone(),
                includes_kept: include_kept,
            });
            Ok(())
        })
    }
}
