//! Create and update paths for saved items.
//!
//! Every path that changes where an item comes from (its link URL or its
//! files) re-derives the item's auto-tags. Each path stores its rows and tags
//! in one transaction, so a failure leaves nothing half-written. Media
//! resolution runs before the transaction opens.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use sqlx::{Sqlite, Transaction};
use thiserror::Error;
use tracing::{info, warn};

use crate::db::{
    self, Database, File, Item, ItemKind, ItemOrder, ItemUpdate, NewFile, NewItem, Tag,
};
use crate::handlers::{DomainClassifier, UrlError};
use crate::refresh::{refresh_link_media, RefreshOutcome};
use crate::resolver::{MediaResolver, MediaVariant};
use crate::tags::{sync_item_tags, validate_tag_name};

const NO_ORIGINS: &[&str] = &[];

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Request to save a link.
#[derive(Debug, Clone)]
pub struct NewLinkItem {
    pub name: String,
    pub url: String,
    pub date_of_origin: Option<String>,
    pub tags: Vec<String>,
}

/// Request to save a group of files.
#[derive(Debug, Clone)]
pub struct NewFileGroupItem {
    pub name: String,
    pub description: String,
    pub date_of_origin: Option<String>,
    pub files: Vec<NewFile>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkDetail {
    pub id: i64,
    pub url: String,
    pub media_url: Option<String>,
    pub media: Vec<MediaVariant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileGroupDetail {
    pub id: i64,
    pub description: String,
    pub files: Vec<File>,
}

/// An item with everything hanging off it.
#[derive(Debug, Clone, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: Item,
    pub tags: Vec<String>,
    pub link: Option<LinkDetail>,
    pub file_group: Option<FileGroupDetail>,
}

#[derive(Clone)]
pub struct Library {
    db: Database,
    classifier: Arc<DomainClassifier>,
    resolver: MediaResolver,
}

impl Library {
    #[must_use]
    pub fn new(db: Database, classifier: DomainClassifier, resolver: MediaResolver) -> Self {
        Self {
            db,
            classifier: Arc::new(classifier),
            resolver,
        }
    }

    /// Validate, resolve and store a new link item.
    ///
    /// A link whose media cannot be resolved is still saved.
    ///
    /// # Errors
    ///
    /// Fails on URL validation errors, bad tag names or database errors.
    pub async fn create_link_item(&self, new: NewLinkItem) -> Result<ItemDetail, LibraryError> {
        let user_tags = validate_tags(&new.tags)?;
        let name = validate_name(&new.name)?;
        let canonical = self.classifier.canonicalize(&new.url)?;

        let resolution = self.resolver.resolve(&canonical).await;
        if resolution.is_empty() {
            warn!(url = %canonical.normalized_url(), "No media found for new link, saving without media");
        }

        let mut tx = self.begin().await?;
        let item_id = db::insert_item(
            &mut *tx,
            &NewItem {
                name,
                kind: ItemKind::Link,
                date_of_origin: new.date_of_origin,
            },
        )
        .await?;
        let link_id = db::insert_link(&mut *tx, item_id, canonical.normalized_url()).await?;

        if !resolution.is_empty() {
            db::replace_media_variants(&mut *tx, link_id, &resolution.variants).await?;
        }

        db::add_item_tags(&mut *tx, item_id, &user_tags).await?;
        sync_item_tags(&mut *tx, item_id, Some(&canonical), NO_ORIGINS).await?;
        commit(tx).await?;

        info!(item_id, link_id, url = %canonical.normalized_url(), "Saved link");
        self.item_detail(item_id).await
    }

    /// Point a link at a new URL, re-resolving its media and tags.
    ///
    /// # Errors
    ///
    /// Fails if the link does not exist, the URL does not validate or the
    /// database update fails.
    pub async fn update_link_url(&self, link_id: i64, url: &str) -> Result<ItemDetail, LibraryError> {
        let link = db::get_link(self.db.pool(), link_id)
            .await?
            .ok_or(LibraryError::NotFound("Link"))?;
        let canonical = self.classifier.canonicalize(url)?;

        let resolution = self.resolver.resolve(&canonical).await;
        if resolution.is_empty() {
            warn!(link_id, url = %canonical.normalized_url(), "No media found for updated link");
        }

        let mut tx = self.begin().await?;
        db::update_link_url(&mut *tx, link_id, canonical.normalized_url()).await?;
        db::replace_media_variants(&mut *tx, link_id, &resolution.variants).await?;
        sync_item_tags(&mut *tx, link.item_id, Some(&canonical), NO_ORIGINS).await?;
        commit(tx).await?;

        self.item_detail(link.item_id).await
    }

    /// Re-resolve a link's media.
    ///
    /// # Errors
    ///
    /// Fails if the link does not exist or storing the new media fails.
    pub async fn refresh_link(&self, link_id: i64) -> Result<RefreshOutcome, LibraryError> {
        let pool = self.db.pool();
        let link = db::get_link(pool, link_id)
            .await?
            .ok_or(LibraryError::NotFound("Link"))?;

        Ok(refresh_link_media(&self.classifier, &self.resolver, pool, &link).await?)
    }

    /// Store a new file group item.
    ///
    /// # Errors
    ///
    /// Fails on bad tag names or database errors.
    pub async fn create_file_group(
        &self,
        new: NewFileGroupItem,
    ) -> Result<ItemDetail, LibraryError> {
        let user_tags = validate_tags(&new.tags)?;
        let name = validate_name(&new.name)?;
        validate_files(&new.files)?;

        let mut tx = self.begin().await?;
        let item_id = db::insert_item(
            &mut *tx,
            &NewItem {
                name,
                kind: ItemKind::FileGroup,
                date_of_origin: new.date_of_origin,
            },
        )
        .await?;
        let group_id = db::insert_file_group(&mut *tx, item_id, &new.description).await?;
        for file in &new.files {
            db::insert_file(&mut *tx, group_id, file).await?;
        }

        db::add_item_tags(&mut *tx, item_id, &user_tags).await?;
        let origins = db::get_file_origins(&mut *tx, group_id).await?;
        sync_item_tags(&mut *tx, item_id, None, &origins).await?;
        commit(tx).await?;

        info!(item_id, group_id, files = new.files.len(), "Saved file group");
        self.item_detail(item_id).await
    }

    /// Append files to an existing group and re-derive its tags.
    ///
    /// # Errors
    ///
    /// Fails if the group does not exist or the database update fails.
    pub async fn add_files(
        &self,
        group_id: i64,
        files: &[NewFile],
    ) -> Result<ItemDetail, LibraryError> {
        validate_files(files)?;
        let group = db::get_file_group(self.db.pool(), group_id)
            .await?
            .ok_or(LibraryError::NotFound("File group"))?;

        // Open with a write: a read-first transaction cannot wait for the
        // write lock under WAL.
        let mut tx = self.begin().await?;
        for file in files {
            db::insert_file(&mut *tx, group.id, file).await?;
        }

        let origins = db::get_file_origins(&mut *tx, group.id).await?;
        sync_item_tags(&mut *tx, group.item_id, None, &origins).await?;
        commit(tx).await?;

        self.item_detail(group.item_id).await
    }

    /// Whether a file group exists.
    ///
    /// # Errors
    ///
    /// Fails if the lookup fails.
    pub async fn file_group_exists(&self, group_id: i64) -> Result<bool, LibraryError> {
        Ok(db::get_file_group(self.db.pool(), group_id).await?.is_some())
    }

    /// Attach user tags to an item.
    ///
    /// # Errors
    ///
    /// Fails if the item does not exist or a tag name is invalid.
    pub async fn add_tags(&self, item_id: i64, names: &[String]) -> Result<ItemDetail, LibraryError> {
        let names = validate_tags(names)?;
        let pool = self.db.pool();
        if db::get_item(pool, item_id).await?.is_none() {
            return Err(LibraryError::NotFound("Item"));
        }
        db::add_item_tags(pool, item_id, &names).await?;
        self.item_detail(item_id).await
    }

    /// Every item in the given order, written `field` or `-field` for
    /// descending. Sortable fields are `created_at` and `name`; the default
    /// is newest first.
    ///
    /// # Errors
    ///
    /// Fails on an unknown ordering or if the query fails.
    pub async fn list_items(&self, ordering: Option<&str>) -> Result<Vec<Item>, LibraryError> {
        let order = match ordering {
            None => ItemOrder::default(),
            Some(raw) => ItemOrder::parse(raw.trim()).ok_or_else(|| {
                LibraryError::Validation(format!(
                    "Unknown ordering '{raw}', expected one of created_at, -created_at, name, -name"
                ))
            })?,
        };
        Ok(db::list_items(self.db.pool(), order).await?)
    }

    /// Rename an item or change its date of origin.
    ///
    /// # Errors
    ///
    /// Fails if the item does not exist, the new name is blank or the update
    /// fails.
    pub async fn update_item(
        &self,
        item_id: i64,
        mut update: ItemUpdate,
    ) -> Result<ItemDetail, LibraryError> {
        if let Some(name) = update.name.take() {
            update.name = Some(validate_name(&name)?);
        }
        if !db::update_item(self.db.pool(), item_id, &update).await? {
            return Err(LibraryError::NotFound("Item"));
        }
        self.item_detail(item_id).await
    }

    /// Load an item with its tags and contents.
    ///
    /// # Errors
    ///
    /// Fails if the item does not exist or a query fails.
    pub async fn item_detail(&self, item_id: i64) -> Result<ItemDetail, LibraryError> {
        let pool = self.db.pool();
        let item = db::get_item(pool, item_id)
            .await?
            .ok_or(LibraryError::NotFound("Item"))?;

        let tags = db::get_item_tags(pool, item_id)
            .await?
            .into_iter()
            .map(|t| t.name)
            .collect();

        let link = match db::get_link_by_item(pool, item_id).await? {
            Some(link) => {
                let media = db::get_media_variants(pool, link.id)
                    .await?
                    .iter()
                    .map(db::MediaVariantRow::to_variant)
                    .collect();
                Some(LinkDetail {
                    id: link.id,
                    url: link.url,
                    media_url: link.media_url,
                    media,
                })
            }
            None => None,
        };

        let file_group = match db::get_file_group_by_item(pool, item_id).await? {
            Some(group) => Some(FileGroupDetail {
                files: db::get_files(pool, group.id).await?,
                id: group.id,
                description: group.description,
            }),
            None => None,
        };

        Ok(ItemDetail {
            item,
            tags,
            link,
            file_group,
        })
    }

    /// Delete an item together with its link or files.
    ///
    /// # Errors
    ///
    /// Fails if the item does not exist or the delete fails.
    pub async fn delete_item(&self, item_id: i64) -> Result<(), LibraryError> {
        if db::delete_item(self.db.pool(), item_id).await? {
            info!(item_id, "Deleted item");
            Ok(())
        } else {
            Err(LibraryError::NotFound("Item"))
        }
    }

    /// Every known tag, ordered by name.
    ///
    /// # Errors
    ///
    /// Fails if the query fails.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, LibraryError> {
        Ok(db::list_tags(self.db.pool()).await?)
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, LibraryError> {
        Ok(self
            .db
            .pool()
            .begin()
            .await
            .context("Failed to begin transaction")?)
    }
}

async fn commit(tx: Transaction<'_, Sqlite>) -> Result<(), LibraryError> {
    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

fn validate_name(name: &str) -> Result<String, LibraryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::Validation("Name cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_tags(names: &[String]) -> Result<Vec<String>, LibraryError> {
    names
        .iter()
        .map(|n| {
            validate_tag_name(n)
                .map(ToString::to_string)
                .map_err(LibraryError::Validation)
        })
        .collect()
}

fn validate_files(files: &[NewFile]) -> Result<(), LibraryError> {
    if files.iter().any(|f| f.file_name.trim().is_empty()) {
        return Err(LibraryError::Validation(
            "File name cannot be empty".to_string(),
        ));
    }
    // Origins become `src-{origin}` tags.
    if let Some(f) = files.iter().find(|f| f.file_origin.contains(',')) {
        return Err(LibraryError::Validation(format!(
            "File origin must not contain commas: '{}'",
            f.file_origin
        )));
    }
    Ok(())
}
