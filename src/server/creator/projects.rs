use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::access::require_project_owner;
use crate::server::dto::{CreateProjectRequest, UpdateProjectRequest};
use crate::server::response::{ApiError, ApiResponse, NOT_FOUND_MESSAGE, StoreOptionExt};
use crate::types::{NewProject, Project};

pub async fn create(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    body: Option<Json<CreateProjectRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<Project>>), ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let store = state.store.as_ref();

    store.insert_project(&NewProject {
        slug: slug.clone(),
        idp_user_id: auth.idp_user_id,
        git_url: req.git_url,
    })?;

    let project = store.get_project(&slug)?.or_not_found(NOT_FOUND_MESSAGE)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn update(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> Result<Json<ApiResponse<Project>>, ApiError> {
    let store = state.store.as_ref();
    require_project_owner(store, &slug, &auth.idp_user_id)?;

    if let Some(git_url) = req.git_url {
        store.update_project_git_url(&slug, &git_url)?;
    }

    let project = store.get_project(&slug)?.or_not_found(NOT_FOUND_MESSAGE)?;
    Ok(Json(ApiResponse::success(project)))
}

pub async fn remove(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.as_ref();
    require_project_owner(store, &slug, &auth.idp_user_id)?;

    store.delete_project(&slug)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Freezes the draft into the next published revision and opens its successor.
/// Publishing an unchanged draft is allowed and simply advances the numbers.
pub async fn publish(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.as_ref();
    require_project_owner(store, &slug, &auth.idp_user_id)?;

    store.publish_version(&slug, None)?;
    Ok(StatusCode::NO_CONTENT)
}
