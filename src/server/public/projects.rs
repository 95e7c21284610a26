use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::auth::OptionalUser;
use crate::server::AppState;
use crate::server::access::ensure_owner;
use crate::server::dto::{LatestRevisionsParams, ProjectDetailsResponse, split_csv};
use crate::server::response::{ApiError, ApiResponse, NOT_FOUND_MESSAGE, StoreOptionExt};
use crate::types::RevisionSelector;

use super::parse_selector;

fn project_details(
    state: &AppState,
    slug: &str,
    selector: RevisionSelector,
    user: Option<&str>,
) -> Result<Json<ApiResponse<ProjectDetailsResponse>>, ApiError> {
    let store = state.store.as_ref();

    let project = store.get_project(slug)?.or_not_found(NOT_FOUND_MESSAGE)?;
    if selector.is_draft() {
        ensure_owner(&project, user)?;
    }

    let version = store
        .resolve_version(slug, selector)?
        .or_not_found(NOT_FOUND_MESSAGE)?;
    let files = store.list_version_files(version.id)?;

    Ok(Json(ApiResponse::success(ProjectDetailsResponse::build(
        &project,
        &version,
        &files,
        state.base_url.as_deref(),
    ))))
}

pub async fn get_latest(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ProjectDetailsResponse>>, ApiError> {
    project_details(&state, &slug, RevisionSelector::Latest, None)
}

pub async fn get_revision(
    auth: OptionalUser,
    State(state): State<Arc<AppState>>,
    Path((slug, revision)): Path<(String, String)>,
) -> Result<Json<ApiResponse<ProjectDetailsResponse>>, ApiError> {
    let selector = parse_selector(&revision)?;
    project_details(&state, &slug, selector, auth.0.as_deref())
}

pub async fn latest_revisions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LatestRevisionsParams>,
) -> Result<Json<ApiResponse<BTreeMap<String, i64>>>, ApiError> {
    let slugs = params.slugs.as_deref().map(split_csv);

    let revisions = state.store.latest_revisions(slugs.as_deref())?;

    Ok(Json(ApiResponse::success(revisions.into_iter().collect())))
}

pub async fn latest_revision(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<i64>>, ApiError> {
    let project = state
        .store
        .get_project(&slug)?
        .or_not_found(NOT_FOUND_MESSAGE)?;
    let revision = project.latest_revision.or_not_found(NOT_FOUND_MESSAGE)?;

    Ok(Json(ApiResponse::success(revision)))
}
