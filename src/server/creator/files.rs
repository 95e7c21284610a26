use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
};
use bytes::Bytes;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::require_project_owner;
use crate::server::response::ApiError;
use crate::store::FilePath;
use crate::types::UploadedFile;

const DEFAULT_MIMETYPE: &str = "application/octet-stream";

/// Uploads one draft file. The bytes go into the content store first (by
/// digest, deduplicated), then the draft's file row is upserted to point at
/// the new digest. Repeating an identical upload changes nothing.
pub async fn upload(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((slug, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let store = state.store.as_ref();
    require_project_owner(store, &slug, &auth.idp_user_id)?;

    let path = FilePath::parse(&path)?;
    let mimetype = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_MIMETYPE)
        .to_string();

    let sha256 = state.content.put(&body).await?;

    store.upsert_draft_file(
        &slug,
        &path,
        &UploadedFile {
            mimetype,
            size_of_content: body.len() as i64,
            sha256,
            image_width: None,
            image_height: None,
        },
    )?;

    Ok(StatusCode::NO_CONTENT)
}

/// Soft-deletes a draft file. Published revisions referencing the same path or
/// digest are unaffected; the content store keeps the bytes.
pub async fn remove(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((slug, path)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.as_ref();
    require_project_owner(store, &slug, &auth.idp_user_id)?;

    let path = FilePath::parse(&path)?;
    store.delete_draft_file(&slug, &path)?;

    Ok(StatusCode::NO_CONTENT)
}
