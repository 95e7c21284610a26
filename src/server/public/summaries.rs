use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};

use crate::server::AppState;
use crate::server::dto::{ProjectSummaryResponse, SummaryParams, split_csv};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::validate_search;
use crate::store::SummaryFilter;

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<ApiResponse<Vec<ProjectSummaryResponse>>>, ApiError> {
    if let Some(search) = &params.search {
        validate_search(search)?;
    }

    let filter = SummaryFilter {
        slugs: params.slugs.as_deref().map(split_csv),
        badges: params.badge.into_iter().collect(),
        categories: params.category.into_iter().collect(),
        search: params.search,
        user_id: params.user_id,
        page_start: params.page_start,
        page_length: params.page_length,
        sort: params.sort.unwrap_or_default(),
    };

    let summaries = state.store.project_summaries(&filter)?;

    Ok(Json(ApiResponse::success(
        summaries
            .into_iter()
            .map(|s| ProjectSummaryResponse::from_summary(s, state.base_url.as_deref()))
            .collect(),
    )))
}
