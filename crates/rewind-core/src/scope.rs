//! Retention scope
//!
//! Turns a record's retention policy into the filter that decides which of
//! its snapshots are "in window". Reads only ever see in-window rows; prune
//! deletes everything else.
//!
//! A filter is a plain value. Repositories either translate it into their
//! own query language (see the SQLite repository) or evaluate it directly
//! over rows with [`SnapshotFilter::select`].

use chrono::{DateTime, Utc};

use crate::limits::{RetentionLimits, RetentionPolicy};
use crate::snapshot::Snapshot;

/// Window over one record's snapshots, newest first
///
/// Rows are first restricted to candidates (`exclude_kept` drops kept rows),
/// then to `created_at >= min_created_at`, then capped to the `max_count`
/// highest ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotFilter {
    pub limits: RetentionLimits,
    pub exclude_kept: bool,
}

impl SnapshotFilter {
    /// Ordering only: every row is visible
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The in-window filter for a policy
    pub fn in_window(policy: &RetentionPolicy) -> Self {
        Self {
            limits: policy.resolve(),
            exclude_kept: false,
        }
    }

    /// Restrict candidates to unkept rows
    pub fn excluding_kept(mut self) -> Self {
        self.exclude_kept = true;
        self
    }

    pub fn max_count(&self) -> Option<u32> {
        self.limits.max_count
    }

    pub fn min_created_at(&self) -> Option<DateTime<Utc>> {
        self.limits.min_created_at
    }

    /// True when the row takes part in the window at all
    pub fn is_candidate(&self, snapshot: &Snapshot) -> bool {
        !(self.exclude_kept && snapshot.is_kept)
    }

    /// Rows inside the window, highest id first
    pub fn select<'a, I>(&self, rows: I) -> Vec<&'a Snapshot>
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let mut window: Vec<&Snapshot> = rows
            .into_iter()
            .filter(|s| self.is_candidate(s))
            .filter(|s| self.min_created_at().map_or(true, |min| s.created_at >= min))
            .collect();

        window.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(max) = self.max_count() {
            window.truncate(max as usize);
        }
        window
    }
}

/// The in-window filter for a policy
pub fn in_window(policy: &RetentionPolicy) -> SnapshotFilter {
    SnapshotFilter::in_window(policy)
}

/// Output order of a query, applied after the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Descending,
    Ascending,
}

/// A read against one record's snapshots
///
/// The window is computed first; `id`, `direction` and `limit` only narrow
/// and reorder what the window already admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotQuery {
    pub filter: SnapshotFilter,
    pub id: Option<i64>,
    pub direction: Direction,
    pub limit: Option<u32>,
}

impl SnapshotQuery {
    pub fn new(filter: SnapshotFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Ignore retention and see every row
    pub fn raw() -> Self {
        Self::new(SnapshotFilter::unbounded())
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn ascending(mut self) -> Self {
        self.direction = Direction::Ascending;
        self
    }

    /// Only the first row in output order
    pub fn first(mut self) -> Self {
        self.limit = Some(1);
        self
    }

    /// Evaluate over in-memory rows
    pub fn apply<'a, I>(&self, rows: I) -> Vec<&'a Snapshot>
    where
        I: IntoIterator<Item = &'a Snapshot>,
    {
        let mut out = self.filter.select(rows);
        if let Some(id) = self.id {
            out.retain(|s| s.id == id);
        }
        if self.direction == Direction::Ascending {
            out.reverse();
        }
        if let Some(limit) = self.limit {
            out.truncate(limit as usize);
        }
        out
    }
}
