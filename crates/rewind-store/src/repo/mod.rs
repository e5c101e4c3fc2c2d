//! Repository layer for persisting snapshots to SQLite

pub mod sqlite_repo;

pub use sqlite_repo::SqliteSnapshotRepo;
