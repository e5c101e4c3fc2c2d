//! Lifecycle hooks
//!
//! Call these from wherever the application persists a record: `on_created`
//! right after the first save, `on_updated` after every later save. The
//! record's own predicates decide whether a snapshot is taken and whether
//! the update prunes.

#![allow(clippy::result_large_err)]

use crate::context::RewindContext;
use crate::errors::Result;
use crate::record::Rewindable;
use crate::repository::SnapshotRepository;

/// Snapshot a freshly created record
///
/// The first snapshot is kept when the record asks for it and never prunes.
/// Returns `None` when the record opts out of snapshots on create.
///
/// # Errors
///
/// Repository failures from the insert.
pub fn on_created<R, S>(record: &mut R, repo: &mut S, ctx: &RewindContext) -> Result<Option<R>>
where
    R: Rewindable,
    S: SnapshotRepository + ?Sized,
{
    if !record.snapshot_on_create() {
        return Ok(None);
    }
    let keep = record.keep_first_snapshot();
    record.rewind(repo, ctx).create(keep, false, false).map(Some)
}

/// Snapshot an updated record, pruning unkept rows if the record asks for it
///
/// Returns `None` when the record opts out of snapshots on update.
///
/// # Errors
///
/// Repository failures from the insert or the prune.
pub fn on_updated<R, S>(record: &mut R, repo: &mut S, ctx: &RewindContext) -> Result<Option<R>>
where
    R: Rewindable,
    S: SnapshotRepository + ?Sized,
{
    if !record.snapshot_on_update() {
        return Ok(None);
    }
    let prune = record.prune_on_update();
    record.rewind(repo, ctx).create(false, prune, false).map(Some)
}
