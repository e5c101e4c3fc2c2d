//! Rewind Store - SQLite persistence for rewind snapshots
//!
//! Provides:
//! - Connection management and configuration loading
//! - Embedded, checksummed schema migrations
//! - `SqliteSnapshotRepo`, the SQLite implementation of `SnapshotRepository`

pub mod config;
pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use config::{DatabaseConfig, LoggingConfig, RewindConfig};
pub use errors::Result;
pub use repo::SqliteSnapshotRepo;
