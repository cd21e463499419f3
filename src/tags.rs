//! Auto-tags derived from where an item came from.
//!
//! Auto-tags live in reserved name prefixes (`src-`, `subreddit-`, `user-`).
//! Re-deriving replaces everything under those prefixes and leaves every
//! other tag alone.

use std::collections::BTreeSet;

use anyhow::Result;
use sqlx::{Acquire, Sqlite};
use tracing::debug;

use crate::db;
use crate::handlers::{CanonicalUrl, HostKind};

/// Name prefixes owned by the tag deriver.
pub const AUTO_TAG_PREFIXES: &[&str] = &["src-", "subreddit-", "user-"];

#[must_use]
pub fn is_auto_tag(name: &str) -> bool {
    AUTO_TAG_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Auto-tags for a link identity and/or file origins.
#[must_use]
pub fn derive_auto_tags<S: AsRef<str>>(
    canonical: Option<&CanonicalUrl>,
    file_origins: &[S],
) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();

    if let Some(canonical) = canonical {
        tags.insert(format!("src-{}", canonical.provider()));
        match canonical.host_kind() {
            HostKind::Subreddit => {
                tags.insert(format!("subreddit-{}", canonical.host_name()));
            }
            HostKind::User => {
                tags.insert(format!("user-{}", canonical.host_name()));
            }
            HostKind::Unknown => {}
        }
    }

    let origins: BTreeSet<&str> = file_origins
        .iter()
        .map(|o| o.as_ref().trim())
        .filter(|o| !o.is_empty())
        .collect();
    if !origins.is_empty() {
        tags.insert("src-file".to_string());
        tags.extend(origins.into_iter().map(|o| format!("src-{o}")));
    }

    tags
}

/// Drop stale auto-tags from `current` and add the fresh ones.
#[must_use]
pub fn reconcile_tags<S: AsRef<str>>(current: &[S], auto: &BTreeSet<String>) -> BTreeSet<String> {
    current
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !is_auto_tag(name))
        .map(ToString::to_string)
        .chain(auto.iter().cloned())
        .collect()
}

/// Check a user-supplied tag name, returning it trimmed.
///
/// # Errors
///
/// Returns a message suitable for a validation response.
pub fn validate_tag_name(name: &str) -> Result<&str, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Tag name cannot be empty".to_string());
    }
    if trimmed.contains(',') {
        return Err(format!("Tag name must not contain commas: '{trimmed}'"));
    }
    Ok(trimmed)
}

/// Re-derive and store an item's auto-tags.
///
/// Only tags under [`AUTO_TAG_PREFIXES`] are replaced, in one transaction, so
/// user tags attached concurrently are never dropped. The stored result
/// matches [`reconcile_tags`] applied to the item's current tags.
///
/// # Errors
///
/// Returns an error if a derived tag is not a valid tag name or the database
/// update fails. Nothing is written in either case.
pub async fn sync_item_tags<'a, A, S>(
    conn: A,
    item_id: i64,
    canonical: Option<&CanonicalUrl>,
    file_origins: &[S],
) -> Result<BTreeSet<String>>
where
    A: Acquire<'a, Database = Sqlite>,
    S: AsRef<str>,
{
    let auto = derive_auto_tags(canonical, file_origins);
    for tag in &auto {
        validate_tag_name(tag)
            .map_err(|e| anyhow::anyhow!("Cannot derive auto-tags for item {item_id}: {e}"))?;
    }

    debug!(item_id, tags = ?auto, "Syncing auto-tags");
    let names: Vec<&String> = auto.iter().collect();
    db::replace_prefixed_item_tags(conn, item_id, AUTO_TAG_PREFIXES, &names).await?;

    Ok(auto)
}
