use serde::{Deserialize, Serialize};

use crate::resolver::{MediaType, MediaVariant};

/// What an item holds. Stored as its snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ItemKind {
    Link,
    FileGroup,
}

/// A saved bookmark: either a link or a group of files.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub kind: ItemKind,
    pub date_of_origin: Option<String>,
    pub created_at: String,
}

/// For creating new items.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub kind: ItemKind,
    pub date_of_origin: Option<String>,
}

/// Sort order for item listings, written `field` or `-field` for descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemOrder {
    CreatedAsc,
    #[default]
    CreatedDesc,
    NameAsc,
    NameDesc,
}

impl ItemOrder {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created_at" => Some(Self::CreatedAsc),
            "-created_at" => Some(Self::CreatedDesc),
            "name" => Some(Self::NameAsc),
            "-name" => Some(Self::NameDesc),
            _ => None,
        }
    }
}

/// Partial update of an item. `None` leaves a field unchanged;
/// `date_of_origin: Some(None)` clears the date.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub date_of_origin: Option<Option<String>>,
}

// Distinguishes an explicit `null` from a missing field.
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A saved social media post. `media_url` mirrors the first variant's HD URL.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Link {
    pub id: i64,
    pub item_id: i64,
    pub url: String,
    pub media_url: Option<String>,
}

/// A stored media variant row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MediaVariantRow {
    pub id: i64,
    pub link_id: i64,
    pub url: String,
    pub hd_url: Option<String>,
    pub sd_url: Option<String>,
    pub media_type: String,
    pub position: i64,
}

impl MediaVariantRow {
    /// Convert back into a resolver variant. Rows with an unknown media type
    /// are treated as video, the column default.
    #[must_use]
    pub fn to_variant(&self) -> MediaVariant {
        let hd_url = self.hd_url.clone().unwrap_or_else(|| self.url.clone());
        MediaVariant {
            sd_url: self.sd_url.clone().unwrap_or_else(|| hd_url.clone()),
            hd_url,
            media_type: MediaType::parse(&self.media_type).unwrap_or(MediaType::Video),
            order: self.position.max(0) as u32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileGroup {
    pub id: i64,
    pub item_id: i64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct File {
    pub id: i64,
    pub file_group_id: i64,
    pub file_name: String,
    pub file_type: String,
    pub file_origin: String,
    pub file_url: Option<String>,
}

/// For creating new files.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFile {
    pub file_name: String,
    #[serde(default)]
    pub file_type: String,
    pub file_origin: String,
    #[serde(default)]
    pub file_url: Option<String>,
}
