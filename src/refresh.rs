use anyhow::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::{self, Link};
use crate::handlers::DomainClassifier;
use crate::resolver::MediaResolver;

/// Outcome of re-resolving a saved link. A failed refresh is not an error:
/// it means nothing usable was found and the stored media was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub success: bool,
    pub message: String,
}

impl RefreshOutcome {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Re-run extraction for a link and swap in the new media variants.
///
/// Stored variants are only replaced when resolution finds something; the
/// swap itself is a single transaction.
///
/// # Errors
///
/// Returns an error if writing the new variants fails. The previous variants
/// are left intact in that case.
pub async fn refresh_link_media(
    classifier: &DomainClassifier,
    resolver: &MediaResolver,
    pool: &SqlitePool,
    link: &Link,
) -> Result<RefreshOutcome> {
    let canonical = match classifier.canonicalize(&link.url) {
        Ok(c) => c,
        Err(e) => {
            warn!(link_id = link.id, url = %link.url, error = %e, "Stored link URL no longer validates");
            return Ok(RefreshOutcome::failed(e.to_string()));
        }
    };

    let resolution = resolver.resolve(&canonical).await;
    if resolution.is_empty() {
        info!(link_id = link.id, url = %link.url, "Refresh found no media, keeping stored variants");
        return Ok(RefreshOutcome::failed("No media found"));
    }

    db::replace_media_variants(pool, link.id, &resolution.variants).await?;
    info!(
        link_id = link.id,
        variants = resolution.variants.len(),
        "Refreshed link media"
    );

    Ok(RefreshOutcome {
        success: true,
        message: "Success".to_string(),
    })
}
