//! Database connection management
//!
//! Provides utilities for opening and managing SQLite connections

#![allow(clippy::result_large_err)]

use crate::config::DatabaseConfig;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection with the default settings
pub fn configure(conn: &Connection) -> Result<()> {
    configure_with(conn, &DatabaseConfig::default())
}

/// Configure a connection from explicit settings
pub fn configure_with(conn: &Connection, config: &DatabaseConfig) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", config.foreign_keys)
        .map_err(from_rusqlite)?;

    if config.wal {
        // In-memory databases report "memory" and stay as they are.
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(from_rusqlite)?;
    }

    Ok(())
}

/// Open, configure and migrate the database a config points at
///
/// A config without a path opens a private in-memory database.
pub fn open_with(config: &DatabaseConfig) -> Result<Connection> {
    let mut conn = match &config.path {
        Some(path) => open(path)?,
        None => open_in_memory()?,
    };
    configure_with(&conn, config)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_with_default_config_is_migrated() {
        let conn = open_with(&DatabaseConfig::default()).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'rewind_states'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn test_configure_sets_foreign_keys() {
        let conn = open_in_memory().unwrap();
        configure(&conn).unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
