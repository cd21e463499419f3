mod migrations;
mod models;
mod queries;

pub use migrations::LATEST_VERSION;
pub use models::*;
pub use queries::*;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::info;

/// Handle to the media shelf SQLite database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `path` and bring its schema
    /// up to date. The parent directory is created when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the connection
    /// fails, a migration fails or the file is read-only.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options(path))
            .await
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;

        let db = Self { pool };
        migrations::run(&db.pool).await?;
        db.ensure_writable(path).await?;

        info!(
            path = %path.display(),
            schema_version = LATEST_VERSION,
            "Database ready"
        );
        Ok(db)
    }

    /// Current schema version recorded in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the version table cannot be read.
    pub async fn schema_version(&self) -> Result<i32> {
        migrations::get_schema_version(&self.pool).await
    }

    // A read-only volume otherwise only shows up on the first saved link.
    async fn ensure_writable(&self, path: &Path) -> Result<()> {
        sqlx::query("UPDATE _schema_version SET version = version")
            .execute(&self.pool)
            .await
            .with_context(|| {
                format!(
                    "SQLite database is not writable (path: {}). Check volume mount permissions/ownership",
                    path.display()
                )
            })?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn connect_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        // Item deletes cascade to links, variants, files and tag links.
        .foreign_keys(true)
        // Request handlers write concurrently through one pool.
        .busy_timeout(Duration::from_secs(10))
}
