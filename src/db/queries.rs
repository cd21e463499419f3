//! Query functions.
//!
//! Single-statement queries are generic over [`Executor`] so the same
//! function runs on `&SqlitePool` or inside a transaction (`&mut *tx`).
//! Multi-statement writes take an [`Acquire`] and open their own
//! transaction, which nests as a savepoint when the caller already holds one.

use anyhow::{Context, Result};
use sqlx::{Acquire, Executor, Sqlite, SqliteConnection};

use super::models::{
    File, FileGroup, Item, ItemOrder, ItemUpdate, Link, MediaVariantRow, NewFile, NewItem, Tag,
};
use crate::resolver::MediaVariant;

// ========== Items ==========

/// Insert a new item, returning its ID.
pub async fn insert_item<'e, E>(executor: E, item: &NewItem) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO items (name, kind, date_of_origin) VALUES (?, ?, ?)")
        .bind(&item.name)
        .bind(item.kind)
        .bind(&item.date_of_origin)
        .execute(executor)
        .await
        .context("Failed to insert item")?;

    Ok(result.last_insert_rowid())
}

/// Get an item by ID.
pub async fn get_item<'e, E>(executor: E, id: i64) -> Result<Option<Item>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT * FROM items WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch item")
}

/// All items in the requested order. Ties fall back to the item ID in the
/// same direction.
pub async fn list_items<'e, E>(executor: E, order: ItemOrder) -> Result<Vec<Item>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = match order {
        ItemOrder::CreatedAsc => "SELECT * FROM items ORDER BY created_at ASC, id ASC",
        ItemOrder::CreatedDesc => "SELECT * FROM items ORDER BY created_at DESC, id DESC",
        ItemOrder::NameAsc => "SELECT * FROM items ORDER BY name ASC, id ASC",
        ItemOrder::NameDesc => "SELECT * FROM items ORDER BY name DESC, id DESC",
    };

    sqlx::query_as(sql)
        .fetch_all(executor)
        .await
        .context("Failed to list items")
}

/// Apply a partial update to an item. Returns false if it did not exist.
pub async fn update_item<'e, E>(executor: E, id: i64, update: &ItemUpdate) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r"
        UPDATE items SET
            name = COALESCE(?, name),
            date_of_origin = CASE WHEN ? THEN ? ELSE date_of_origin END
        WHERE id = ?
        ",
    )
    .bind(&update.name)
    .bind(update.date_of_origin.is_some())
    .bind(update.date_of_origin.clone().flatten())
    .bind(id)
    .execute(executor)
    .await
    .context("Failed to update item")?;

    Ok(result.rows_affected() > 0)
}

/// Delete an item and everything it owns. Returns false if it did not exist.
pub async fn delete_item<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM items WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await
        .context("Failed to delete item")?;

    Ok(result.rows_affected() > 0)
}

// ========== Links ==========

/// Insert a link for an item, returning its ID.
pub async fn insert_link<'e, E>(executor: E, item_id: i64, url: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO links (item_id, url) VALUES (?, ?)")
        .bind(item_id)
        .bind(url)
        .execute(executor)
        .await
        .context("Failed to insert link")?;

    Ok(result.last_insert_rowid())
}

/// Get a link by ID.
pub async fn get_link<'e, E>(executor: E, id: i64) -> Result<Option<Link>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT * FROM links WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch link")
}

/// Get the link owned by an item.
pub async fn get_link_by_item<'e, E>(executor: E, item_id: i64) -> Result<Option<Link>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT * FROM links WHERE item_id = ?")
        .bind(item_id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch link by item")
}

/// Point a link at a new (canonical) URL.
pub async fn update_link_url<'e, E>(executor: E, id: i64, url: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE links SET url = ? WHERE id = ?")
        .bind(url)
        .bind(id)
        .execute(executor)
        .await
        .context("Failed to update link url")?;

    if result.rows_affected() == 0 {
        anyhow::bail!("Link {id} does not exist");
    }
    Ok(())
}

// ========== Media Variants ==========

/// Stored variants of a link in display order.
pub async fn get_media_variants<'e, E>(executor: E, link_id: i64) -> Result<Vec<MediaVariantRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT * FROM media_variants WHERE link_id = ? ORDER BY position, id")
        .bind(link_id)
        .fetch_all(executor)
        .await
        .context("Failed to fetch media variants")
}

/// Replace every variant of a link and update its `media_url` mirror.
///
/// Runs in one transaction: either the new set is fully stored or the old
/// rows are left untouched. An empty `variants` slice clears the link.
pub async fn replace_media_variants<'a, A>(
    conn: A,
    link_id: i64,
    variants: &[MediaVariant],
) -> Result<()>
where
    A: Acquire<'a, Database = Sqlite>,
{
    let mut tx = conn
        .begin()
        .await
        .context("Failed to begin media replace transaction")?;

    sqlx::query("DELETE FROM media_variants WHERE link_id = ?")
        .bind(link_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete old media variants")?;

    for variant in variants {
        sqlx::query(
            r"
            INSERT INTO media_variants (link_id, url, hd_url, sd_url, media_type, position)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(link_id)
        // `url` is the legacy single-URL column; it carries the HD URL.
        .bind(&variant.hd_url)
        .bind(&variant.hd_url)
        .bind(&variant.sd_url)
        .bind(variant.media_type.as_str())
        .bind(i64::from(variant.order))
        .execute(&mut *tx)
        .await
        .context("Failed to insert media variant")?;
    }

    let primary = variants
        .iter()
        .min_by_key(|v| v.order)
        .map(|v| v.hd_url.as_str());

    let updated = sqlx::query("UPDATE links SET media_url = ? WHERE id = ?")
        .bind(primary)
        .bind(link_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update link media url")?;

    if updated.rows_affected() == 0 {
        anyhow::bail!("Link {link_id} does not exist");
    }

    tx.commit()
        .await
        .context("Failed to commit media replace transaction")?;

    Ok(())
}

// ========== Tags ==========

async fn get_or_create_tag_on(conn: &mut SqliteConnection, name: &str) -> Result<Tag> {
    if name.contains(',') {
        anyhow::bail!("Tag name must not contain commas: {name}");
    }

    sqlx::query("INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await
        .context("Failed to insert tag")?;

    sqlx::query_as("SELECT * FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to fetch tag")
}

async fn attach_tags_on<S: AsRef<str>>(
    conn: &mut SqliteConnection,
    item_id: i64,
    names: &[S],
) -> Result<()> {
    for name in names {
        let tag = get_or_create_tag_on(conn, name.as_ref()).await?;
        sqlx::query("INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?, ?)")
            .bind(item_id)
            .bind(tag.id)
            .execute(&mut *conn)
            .await
            .context("Failed to attach tag")?;
    }
    Ok(())
}

/// Fetch a tag by name, creating it on first use.
pub async fn get_or_create_tag<'a, A>(conn: A, name: &str) -> Result<Tag>
where
    A: Acquire<'a, Database = Sqlite>,
{
    let mut conn = conn
        .acquire()
        .await
        .context("Failed to acquire connection")?;
    get_or_create_tag_on(&mut *conn, name).await
}

/// All tags ordered by name.
pub async fn list_tags<'e, E>(executor: E) -> Result<Vec<Tag>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT * FROM tags ORDER BY name")
        .fetch_all(executor)
        .await
        .context("Failed to list tags")
}

/// Tags attached to an item, ordered by name.
pub async fn get_item_tags<'e, E>(executor: E, item_id: i64) -> Result<Vec<Tag>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as(
        r"
        SELECT t.id, t.name
        FROM tags t
        JOIN item_tags it ON it.tag_id = t.id
        WHERE it.item_id = ?
        ORDER BY t.name
        ",
    )
    .bind(item_id)
    .fetch_all(executor)
    .await
    .context("Failed to fetch item tags")
}

/// Replace an item's tag set with exactly `names`.
pub async fn set_item_tags<'a, A, S>(conn: A, item_id: i64, names: &[S]) -> Result<()>
where
    A: Acquire<'a, Database = Sqlite>,
    S: AsRef<str>,
{
    let mut tx = conn
        .begin()
        .await
        .context("Failed to begin tag transaction")?;

    sqlx::query("DELETE FROM item_tags WHERE item_id = ?")
        .bind(item_id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear item tags")?;

    attach_tags_on(&mut tx, item_id, names).await?;

    tx.commit().await.context("Failed to commit tag transaction")?;
    Ok(())
}

/// Attach tags to an item, keeping the ones it already has.
pub async fn add_item_tags<'a, A, S>(conn: A, item_id: i64, names: &[S]) -> Result<()>
where
    A: Acquire<'a, Database = Sqlite>,
    S: AsRef<str>,
{
    let mut tx = conn
        .begin()
        .await
        .context("Failed to begin tag transaction")?;

    attach_tags_on(&mut tx, item_id, names).await?;

    tx.commit().await.context("Failed to commit tag transaction")?;
    Ok(())
}

/// Swap the tags of an item whose names start with one of `prefixes` for
/// exactly `names`. Every other tag of the item is left alone.
///
/// The delete runs first, so the transaction holds the write lock before it
/// touches anything: a concurrent [`add_item_tags`] either lands before it
/// and survives, or waits for it.
pub async fn replace_prefixed_item_tags<'a, A, S>(
    conn: A,
    item_id: i64,
    prefixes: &[&str],
    names: &[S],
) -> Result<()>
where
    A: Acquire<'a, Database = Sqlite>,
    S: AsRef<str>,
{
    let mut tx = conn
        .begin()
        .await
        .context("Failed to begin tag transaction")?;

    for prefix in prefixes {
        // GLOB is case-sensitive, unlike LIKE.
        sqlx::query(
            r"
            DELETE FROM item_tags
            WHERE item_id = ?
              AND tag_id IN (SELECT id FROM tags WHERE name GLOB ? || '*')
            ",
        )
        .bind(item_id)
        .bind(*prefix)
        .execute(&mut *tx)
        .await
        .context("Failed to clear prefixed item tags")?;
    }

    attach_tags_on(&mut tx, item_id, names).await?;

    tx.commit().await.context("Failed to commit tag transaction")?;
    Ok(())
}

// ========== File Groups ==========

/// Insert a file group for an item, returning its ID.
pub async fn insert_file_group<'e, E>(executor: E, item_id: i64, description: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO file_groups (item_id, description) VALUES (?, ?)")
        .bind(item_id)
        .bind(description)
        .execute(executor)
        .await
        .context("Failed to insert file group")?;

    Ok(result.last_insert_rowid())
}

/// Get a file group by ID.
pub async fn get_file_group<'e, E>(executor: E, id: i64) -> Result<Option<FileGroup>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT * FROM file_groups WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch file group")
}

/// Get the file group owned by an item.
pub async fn get_file_group_by_item<'e, E>(executor: E, item_id: i64) -> Result<Option<FileGroup>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT * FROM file_groups WHERE item_id = ?")
        .bind(item_id)
        .fetch_optional(executor)
        .await
        .context("Failed to fetch file group by item")
}

/// Insert a file into a group, returning its ID.
pub async fn insert_file<'e, E>(executor: E, file_group_id: i64, file: &NewFile) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r"
        INSERT INTO files (file_group_id, file_name, file_type, file_origin, file_url)
        VALUES (?, ?, ?, ?, ?)
        ",
    )
    .bind(file_group_id)
    .bind(&file.file_name)
    .bind(&file.file_type)
    .bind(&file.file_origin)
    .bind(&file.file_url)
    .execute(executor)
    .await
    .context("Failed to insert file")?;

    Ok(result.last_insert_rowid())
}

/// Files of a group in insertion order.
pub async fn get_files<'e, E>(executor: E, file_group_id: i64) -> Result<Vec<File>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as("SELECT * FROM files WHERE file_group_id = ? ORDER BY id")
        .bind(file_group_id)
        .fetch_all(executor)
        .await
        .context("Failed to fetch files")
}

/// Distinct non-empty origins of a group's files.
pub async fn get_file_origins<'e, E>(executor: E, file_group_id: i64) -> Result<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String,)> = sqlx::query_as(
        r"
        SELECT DISTINCT file_origin FROM files
        WHERE file_group_id = ? AND file_origin != ''
        ORDER BY file_origin
        ",
    )
    .bind(file_group_id)
    .fetch_all(executor)
    .await
    .context("Failed to fetch file origins")?;

    Ok(rows.into_iter().map(|(origin,)| origin).collect())
}
