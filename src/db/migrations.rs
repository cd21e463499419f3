use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Schema version after every migration has run.
pub const LATEST_VERSION: i32 = 2;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        debug!("Running migration v2");
        run_migration_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: items, tags and links");

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('link', 'file_group')),
            date_of_origin TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create items table")?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE CHECK (instr(name, ',') = 0)
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create tags table")?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS item_tags (
            item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (item_id, tag_id)
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create item_tags table")?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id INTEGER NOT NULL UNIQUE REFERENCES items(id) ON DELETE CASCADE,
            url TEXT NOT NULL,
            media_url TEXT
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create links table")?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS media_variants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            link_id INTEGER NOT NULL REFERENCES links(id) ON DELETE CASCADE,
            url TEXT NOT NULL,
            hd_url TEXT,
            sd_url TEXT,
            media_type TEXT NOT NULL DEFAULT 'video' CHECK (media_type IN ('video', 'image')),
            position INTEGER NOT NULL DEFAULT 0 CHECK (position >= 0)
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create media_variants table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_media_variants_link ON media_variants(link_id, position)",
    )
    .execute(pool)
    .await
    .context("Failed to create media_variants index")?;

    Ok(())
}

async fn run_migration_v2(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v2: file groups");

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS file_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id INTEGER NOT NULL UNIQUE REFERENCES items(id) ON DELETE CASCADE,
            description TEXT NOT NULL DEFAULT ''
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create file_groups table")?;

    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_group_id INTEGER NOT NULL REFERENCES file_groups(id) ON DELETE CASCADE,
            file_name TEXT NOT NULL,
            file_type TEXT NOT NULL DEFAULT '',
            file_origin TEXT NOT NULL DEFAULT '',
            file_url TEXT
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create files table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_group ON files(file_group_id)")
        .execute(pool)
        .await
        .context("Failed to create files index")?;

    Ok(())
}
