use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};
use tokio_util::io::ReaderStream;

use crate::auth::OptionalUser;
use crate::server::AppState;
use crate::server::access::ensure_owner;
use crate::server::response::{ApiError, NOT_FOUND_MESSAGE, StoreOptionExt};
use crate::store::FilePath;
use crate::types::RevisionSelector;

use super::parse_selector;

async fn serve_file(
    state: &AppState,
    user: Option<&str>,
    slug: &str,
    selector: RevisionSelector,
    raw_path: &str,
) -> Result<Response, ApiError> {
    let store = state.store.as_ref();

    if selector.is_draft() {
        let project = store.get_project(slug)?.or_not_found(NOT_FOUND_MESSAGE)?;
        ensure_owner(&project, user)?;
    }

    let path = FilePath::parse(raw_path)?;
    let file = store
        .get_file_metadata(slug, selector, &path)?
        .or_not_found(NOT_FOUND_MESSAGE)?;

    let (reader, size) = state.content.get(&file.sha256).await?;

    // Revision-addressed responses are immutable by construction and may be
    // cached forever. The draft and latest aliases move, so they may not.
    let cache_control = match selector {
        RevisionSelector::Revision(_) => "public, max-age=31536000, immutable",
        RevisionSelector::Draft | RevisionSelector::Latest => "no-cache",
    };

    Response::builder()
        .header(header::CONTENT_TYPE, file.mimetype.as_str())
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}{}\"", file.name, file.ext),
        )
        .header(header::ETAG, format!("\"{}\"", file.sha256))
        .header(header::CACHE_CONTROL, cache_control)
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|_| ApiError::internal("Failed to build file response"))
}

pub async fn download(
    auth: OptionalUser,
    State(state): State<Arc<AppState>>,
    Path((slug, revision, path)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let selector = parse_selector(&revision)?;
    serve_file(&state, auth.0.as_deref(), &slug, selector, &path).await
}

/// The `/draft/files/` route is shared with the creator mutations, so the
/// literal segment never reaches the `{revision}` capture above.
pub async fn download_draft(
    auth: OptionalUser,
    State(state): State<Arc<AppState>>,
    Path((slug, path)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    serve_file(
        &state,
        auth.0.as_deref(),
        &slug,
        RevisionSelector::Draft,
        &path,
    )
    .await
}
