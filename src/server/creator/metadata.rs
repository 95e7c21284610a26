use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::require_project_owner;
use crate::server::response::ApiError;
use crate::types::AppMetadata;

/// Replaces the draft's app metadata document. The typed body is the
/// validation boundary; published revisions keep their own frozen copy.
pub async fn update(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(metadata): Json<AppMetadata>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.as_ref();
    require_project_owner(store, &slug, &auth.idp_user_id)?;

    store.update_draft_metadata(&slug, &metadata)?;
    Ok(StatusCode::NO_CONTENT)
}
