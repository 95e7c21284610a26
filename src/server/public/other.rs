use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};

use crate::server::AppState;
use crate::server::dto::BadgeIdentifiers;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::HubStats;

pub async fn categories(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.categories.clone()))
}

pub async fn badges(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.badges.clone()))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<HubStats>>, ApiError> {
    let stats = state.store.get_stats()?;
    Ok(Json(ApiResponse::success(stats)))
}

/// Liveness answer for badges. A badge that identifies itself gets remembered
/// in the registry, which feeds the /stats badge count.
pub async fn ping(
    State(state): State<Arc<AppState>>,
    Query(who): Query<BadgeIdentifiers>,
) -> Result<&'static str, ApiError> {
    if let Some(id) = who.id.as_deref().filter(|id| !id.is_empty()) {
        state.store.register_badge(id, who.mac.as_deref())?;
    }
    Ok("pong")
}
