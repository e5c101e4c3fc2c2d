//! SQLite repository implementation
//!
//! Persists snapshot rows in the `rewind_states` table. Retention windows are
//! translated into one ordered, limited subquery so that reads, counts and
//! prune deletes all see the same window.

#![allow(clippy::result_large_err)]

use chrono::{DateTime, Utc};
use rewind_core::repository::{DeleteScope, SnapshotRepository};
use rewind_core::scope::{Direction, SnapshotFilter, SnapshotQuery};
use rewind_core::snapshot::{NewSnapshot, Snapshot};
use rewind_core::OwnerKey;
use rusqlite::types::{Type, Value};
use rusqlite::{params_from_iter, Connection, Row};

use crate::config::DatabaseConfig;
use crate::db;
use crate::errors::{from_rusqlite, Result};

const COLUMNS: &str = "id, owner_type, owner_id, data, is_kept, created_at";

/// SQLite-backed snapshot repository
///
/// Owns its connection. Build it from an already migrated connection with
/// [`SqliteSnapshotRepo::new`], or let [`SqliteSnapshotRepo::open`] do the
/// opening and migrating.
#[derive(Debug)]
pub struct SqliteSnapshotRepo {
    conn: Connection,
}

/// SQL text plus its positional parameters
struct Fragment {
    sql: String,
    params: Vec<Value>,
}

fn owner_params(owner: &OwnerKey) -> Vec<Value> {
    vec![
        Value::Text(owner.owner_type().to_string()),
        Value::Text(owner.owner_id().to_string()),
    ]
}

/// `SELECT <columns>` of the rows the filter's window admits, newest first
fn window(columns: &str, owner: &OwnerKey, filter: &SnapshotFilter) -> Fragment {
    let mut sql = format!(
        "SELECT {} FROM rewind_states WHERE owner_type = ? AND owner_id = ?",
        columns
    );
    let mut params = owner_params(owner);

    if filter.exclude_kept {
        sql.push_str(" AND is_kept = 0");
    }
    if let Some(min) = filter.min_created_at() {
        sql.push_str(" AND created_at >= ?");
        params.push(Value::Integer(lower_bound_nanos(min)));
    }
    sql.push_str(" ORDER BY id DESC");
    if let Some(max) = filter.max_count() {
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(i64::from(max)));
    }

    Fragment { sql, params }
}

/// The window, narrowed and reordered by the query
fn query_sql(owner: &OwnerKey, query: &SnapshotQuery) -> Fragment {
    let inner = window(COLUMNS, owner, &query.filter);
    let mut sql = format!("SELECT {} FROM ({})", COLUMNS, inner.sql);
    let mut params = inner.params;

    if let Some(id) = query.id {
        sql.push_str(" WHERE id = ?");
        params.push(Value::Integer(id));
    }
    sql.push_str(match query.direction {
        Direction::Descending => " ORDER BY id DESC",
        Direction::Ascending => " ORDER BY id ASC",
    });
    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(i64::from(limit)));
    }

    Fragment { sql, params }
}

fn delete_sql(owner: &OwnerKey, scope: &DeleteScope) -> Fragment {
    let mut sql = String::from("DELETE FROM rewind_states WHERE owner_type = ? AND owner_id = ?");
    let mut params = owner_params(owner);

    match scope {
        DeleteScope::Id(id) => {
            sql.push_str(" AND id = ?");
            params.push(Value::Integer(*id));
        }
        DeleteScope::All { include_kept } => {
            if !include_kept {
                sql.push_str(" AND is_kept = 0");
            }
        }
        DeleteScope::OutsideWindow(filter) => {
            if filter.exclude_kept {
                sql.push_str(" AND is_kept = 0");
            }
            let keep = window("id", owner, filter);
            sql.push_str(&format!(" AND id NOT IN ({})", keep.sql));
            params.extend(keep.params);
        }
    }

    Fragment { sql, params }
}

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// `created_at` is stored as nanoseconds since the Unix epoch, the precision
/// chrono timestamps carry
fn datetime_to_nanos(at: DateTime<Utc>) -> rusqlite::Result<i64> {
    at.timestamp_nanos_opt().ok_or_else(|| {
        rusqlite::Error::ToSqlConversionFailure(
            format!("timestamp {} outside the storable range", at).into(),
        )
    })
}

fn nanos_to_datetime(column: usize, nanos: i64) -> rusqlite::Result<DateTime<Utc>> {
    let secs = nanos.div_euclid(NANOS_PER_SEC);
    let subsec = nanos.rem_euclid(NANOS_PER_SEC) as u32;
    DateTime::from_timestamp(secs, subsec)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, nanos))
}

/// Age bounds past either end of the storable range admit every row or none
fn lower_bound_nanos(min: DateTime<Utc>) -> i64 {
    match min.timestamp_nanos_opt() {
        Some(nanos) => nanos,
        None if min.timestamp() < 0 => i64::MIN,
        None => i64::MAX,
    }
}

fn row_to_snapshot(row: &Row<'_>) -> rusqlite::Result<Snapshot> {
    let data = match row.get::<_, serde_json::Value>(3)? {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("snapshot data is not a JSON object: {}", other).into(),
            ))
        }
    };

    Ok(Snapshot {
        id: row.get(0)?,
        owner: OwnerKey::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
        data,
        is_kept: row.get(4)?,
        created_at: nanos_to_datetime(5, row.get(5)?)?,
    })
}

impl SqliteSnapshotRepo {
    /// Wrap a connection whose schema is already migrated
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open, configure and migrate the configured database
    ///
    /// # Errors
    ///
    /// `Persistence` when the database cannot be opened or migrated.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        db::open_with(config).map(Self::new)
    }

    /// Private in-memory database, migrated
    ///
    /// # Errors
    ///
    /// `Persistence` when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&DatabaseConfig::default())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SnapshotRepository for SqliteSnapshotRepo {
    fn insert(&mut self, snapshot: NewSnapshot) -> Result<Snapshot> {
        let nanos = datetime_to_nanos(snapshot.created_at).map_err(from_rusqlite)?;
        let data = serde_json::Value::Object(snapshot.data.clone());

        self.conn
            .execute(
                "INSERT INTO rewind_states (owner_type, owner_id, data, is_kept, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    snapshot.owner.owner_type(),
                    snapshot.owner.owner_id(),
                    data,
                    snapshot.is_kept,
                    nanos,
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(snapshot.into_snapshot(self.conn.last_insert_rowid()))
    }

    fn select(&self, owner: &OwnerKey, query: &SnapshotQuery) -> Result<Vec<Snapshot>> {
        let Fragment { sql, params } = query_sql(owner, query);
        let mut stmt = self.conn.prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), row_to_snapshot)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    fn count(&self, owner: &OwnerKey, filter: &SnapshotFilter) -> Result<u64> {
        let inner = window("id", owner, filter);
        let sql = format!("SELECT COUNT(*) FROM ({})", inner.sql);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(inner.params.iter()), |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(count.max(0) as u64)
    }

    fn delete(&mut self, owner: &OwnerKey, scope: &DeleteScope) -> Result<u64> {
        let Fragment { sql, params } = delete_sql(owner, scope);
        let removed = self
            .conn
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(from_rusqlite)?;
        Ok(removed as u64)
    }
}
