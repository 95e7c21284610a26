use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::server::AppState;
use crate::server::dto::{BadgeIdentifiers, CrashReportBody};
use crate::server::response::{ApiError, NOT_FOUND_MESSAGE, StoreOptionExt};
use crate::types::ReportKind;

use super::parse_selector;

/// Badges report installs, launches and crashes per version. The raw counters
/// land here; the distinct-install aggregate the listing sorts on is rebuilt
/// separately by the periodic refresh.
pub async fn report(
    State(state): State<Arc<AppState>>,
    Path((slug, revision, kind)): Path<(String, String, String)>,
    Query(who): Query<BadgeIdentifiers>,
    body: Option<Json<CrashReportBody>>,
) -> Result<StatusCode, ApiError> {
    let kind: ReportKind = kind
        .parse()
        .map_err(|()| ApiError::not_found(NOT_FOUND_MESSAGE))?;
    let selector = parse_selector(&revision)?;

    let store = state.store.as_ref();
    let version = store
        .resolve_version(&slug, selector)?
        .or_not_found(NOT_FOUND_MESSAGE)?;

    if let Some(reason) = body.and_then(|Json(b)| b.reason) {
        tracing::warn!(
            "{} report for {} rev{}: {}",
            kind.as_str(),
            slug,
            version.revision,
            reason
        );
    }

    // Anonymous reports are accepted but uncounted; distinct-install counts
    // only make sense for badges that identify themselves.
    if let Some(id) = who.id.as_deref().filter(|id| !id.is_empty()) {
        store.register_badge(id, who.mac.as_deref())?;
        store.record_version_report(id, version.id, kind)?;
    }

    Ok(StatusCode::NO_CONTENT)
}
