use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ApiError, AppState};
use crate::db::{Item, ItemUpdate, NewFile, Tag};
use crate::library::{ItemDetail, NewFileGroupItem, NewLinkItem};
use crate::refresh::RefreshOutcome;
use crate::storage::content_type_for;

/// Origin recorded for files sent through the upload endpoint.
const UPLOAD_ORIGIN: &str = "upload";

const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/links", post(create_link))
        .route("/api/links/:id", put(update_link))
        .route("/api/links/:id/refresh", post(refresh_link))
        .route("/api/items", get(list_items))
        .route(
            "/api/items/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/api/items/:id/tags", post(add_tags))
        .route("/api/tags", get(list_tags))
        .route("/api/file-groups", post(create_file_group))
        .route(
            "/api/file-groups/:id/upload",
            post(upload_files).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

async fn health() -> &'static str {
    "OK"
}

// ========== Links ==========

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    name: String,
    url: String,
    #[serde(default)]
    date_of_origin: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

async fn create_link(
    State(state): State<AppState>,
    Json(req): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<ItemDetail>), ApiError> {
    debug!(url = %req.url, "Create link request");
    let detail = state
        .library
        .create_link_item(NewLinkItem {
            name: req.name,
            url: req.url,
            date_of_origin: req.date_of_origin,
            tags: req.tags,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateLinkRequest {
    url: String,
}

async fn update_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLinkRequest>,
) -> Result<Json<ItemDetail>, ApiError> {
    Ok(Json(state.library.update_link_url(id, &req.url).await?))
}

async fn refresh_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    let outcome = state.library.refresh_link(id).await?;
    info!(link_id = id, success = outcome.success, message = %outcome.message, "Link refresh finished");
    Ok(Json(outcome))
}

// ========== Items ==========

#[derive(Debug, Deserialize)]
pub struct ListItemsParams {
    ordering: Option<String>,
}

async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListItemsParams>,
) -> Result<Json<Vec<Item>>, ApiError> {
    Ok(Json(
        state.library.list_items(params.ordering.as_deref()).await?,
    ))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<ItemUpdate>,
) -> Result<Json<ItemDetail>, ApiError> {
    Ok(Json(state.library.update_item(id, update).await?))
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ItemDetail>, ApiError> {
    Ok(Json(state.library.item_detail(id).await?))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.library.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AddTagsRequest {
    names: Vec<String>,
}

async fn add_tags(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AddTagsRequest>,
) -> Result<Json<ItemDetail>, ApiError> {
    Ok(Json(state.library.add_tags(id, &req.names).await?))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.library.list_tags().await?))
}

// ========== File Groups ==========

#[derive(Debug, Deserialize)]
pub struct CreateFileGroupRequest {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    date_of_origin: Option<String>,
    #[serde(default)]
    files: Vec<NewFile>,
    #[serde(default)]
    tags: Vec<String>,
}

async fn create_file_group(
    State(state): State<AppState>,
    Json(req): Json<CreateFileGroupRequest>,
) -> Result<(StatusCode, Json<ItemDetail>), ApiError> {
    let detail = state
        .library
        .create_file_group(NewFileGroupItem {
            name: req.name,
            description: req.description,
            date_of_origin: req.date_of_origin,
            files: req.files,
            tags: req.tags,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Upload every file part of a multipart body to remote storage and attach
/// the results to the group.
async fn upload_files(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let Some(storage) = state.storage.clone() else {
        return Err(ApiError::Unavailable(
            "File uploads are not configured".to_string(),
        ));
    };

    if !state.library.file_group_exists(id).await? {
        return Err(ApiError::NotFound("File group not found".to_string()));
    }

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(ToString::to_string) else {
            continue;
        };
        let content_type = content_type_for(&file_name, field.content_type());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {e}")))?;

        let url = storage.upload(&data, &file_name, &content_type).await?;
        info!(file_group_id = id, file = %file_name, bytes = data.len(), url = %url, "Uploaded file");

        files.push(NewFile {
            file_name,
            file_type: content_type,
            file_origin: UPLOAD_ORIGIN.to_string(),
            file_url: Some(url),
        });
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("No files in upload".to_string()));
    }

    let detail = state.library.add_files(id, &files).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}
