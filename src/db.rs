use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::config::Config;
use crate::error::{IndexError, Result};

/// Open the database for writing, creating the file if needed.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::StoreUnavailable(format!(
                    "cannot create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    open(db_path, true).await
}

/// Open an existing database. Fails with `StoreUnavailable` when the file
/// has not been created by `init` or `reindex` yet.
pub async fn connect_existing(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;
    if !db_path.exists() {
        return Err(IndexError::StoreUnavailable(format!(
            "database not initialized at {}",
            db_path.display()
        )));
    }
    open(db_path, false).await
}

async fn open(db_path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
        .map_err(|e| IndexError::StoreUnavailable(e.to_string()))?
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| IndexError::StoreUnavailable(e.to_string()))?;

    tracing::debug!(path = %db_path.display(), create, "opened index store");
    Ok(pool)
}
