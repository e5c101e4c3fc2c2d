//! Configuration file
//!
//! ```toml
//! [database]
//! path = "rewind.db"   # omit for an in-memory database
//! wal = true
//! foreign_keys = true
//!
//! [logging]
//! profile = "production"
//! ```
//!
//! Every key is optional.

#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};

use rewind_core::logging_facility::{self, Profile};
use serde::Deserialize;

use crate::errors::{config_error, io_error, Result};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewindConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Where the snapshot table lives and how the connection is tuned
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub wal: bool,
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            wal: true,
            foreign_keys: true,
        }
    }
}

impl DatabaseConfig {
    /// On-disk database at `path` with default tuning
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
}

impl RewindConfig {
    /// Parse a configuration from TOML text
    ///
    /// # Errors
    ///
    /// `Configuration` when the text is not valid TOML or has unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| config_error(e.to_string()))
    }

    /// Read and parse a TOML configuration file
    ///
    /// A relative database path is resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, `Configuration` when it does not
    /// parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| io_error("load_config", e))?;
        let mut config = Self::from_toml_str(&text)?;

        if let (Some(db_path), Some(dir)) = (&config.database.path, path.parent()) {
            if db_path.is_relative() {
                config.database.path = Some(dir.join(db_path));
            }
        }
        tracing::debug!(config = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Install the subscriber for the configured `[logging]` profile
    ///
    /// Only the first call in a process takes effect.
    pub fn init_logging(&self) {
        logging_facility::init(self.logging.profile);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_gives_defaults() {
        let config = RewindConfig::from_toml_str("").unwrap();
        assert_eq!(config, RewindConfig::default());
        assert!(config.database.wal);
        assert!(config.database.foreign_keys);
        assert_eq!(config.database.path, None);
        assert_eq!(config.logging.profile, Profile::Development);
    }

    #[test]
    fn test_full_config() {
        let config = RewindConfig::from_toml_str(
            r#"
            [database]
            path = "/var/lib/rewind.db"
            wal = false
            foreign_keys = false

            [logging]
            profile = "production"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database.path.as_deref(),
            Some(Path::new("/var/lib/rewind.db"))
        );
        assert!(!config.database.wal);
        assert!(!config.database.foreign_keys);
        assert_eq!(config.logging.profile, Profile::Production);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = RewindConfig::from_toml_str("[database]\nfile = \"x.db\"").unwrap_err();
        assert_eq!(err.code(), "ERR_CONFIGURATION");
    }

    #[test]
    fn test_unknown_profile_is_rejected() {
        let err = RewindConfig::from_toml_str("[logging]\nprofile = \"loud\"").unwrap_err();
        assert_eq!(err.code(), "ERR_CONFIGURATION");
    }
}
