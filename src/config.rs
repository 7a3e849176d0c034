//! Database location resolution.
//!
//! The path comes from `--database`, then `REPORTDB_DATABASE` (also read
//! from a `.env` file), then `reportdb.sqlite3` in the working directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// File name used when no database path is configured.
pub const DEFAULT_DATABASE_FILE: &str = "reportdb.sqlite3";

/// Environment variable overriding the database path.
pub const DATABASE_ENV: &str = "REPORTDB_DATABASE";

/// Runtime configuration shared by the CLI and the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: PathBuf,
}

impl Config {
    /// Builds the configuration from an optional explicit path.
    ///
    /// clap has already folded `REPORTDB_DATABASE` into `database` when the
    /// flag was absent, so `None` here means neither was given.
    pub fn resolve(database: Option<PathBuf>) -> Self {
        Self {
            database: database.unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE)),
        }
    }

    /// Opens the configured database, creating its directory if needed.
    pub fn open_database(&self) -> Result<crate::Database> {
        ensure_database_directory(&self.database)?;
        crate::Database::open(&self.database)
            .with_context(|| format!("Failed to open database {}", self.database.display()))
    }
}

/// Ensures the parent directory of the database file exists.
///
/// Creates the directory structure if it doesn't exist using `create_dir_all`.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}
