use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::Router;

use super::validation::MAX_UPLOAD_FILE_SIZE_BYTES;
use super::{creator, public};
use crate::content::ContentStore;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub content: Arc<ContentStore>,
    /// Public base URL for external access (e.g. "https://hub.example.com").
    /// Used for file download URLs; relative URLs are served when unset.
    pub base_url: Option<String>,
    /// Badge slugs known to this hub, served by /badges and accepted in filters.
    pub badges: Vec<String>,
    /// Category vocabulary, served by /categories.
    pub categories: Vec<String>,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/projects/{slug}",
            get(public::projects::get_latest)
                .post(creator::projects::create)
                .patch(creator::projects::update)
                .delete(creator::projects::remove),
        )
        .route("/projects/{slug}/publish", post(creator::projects::publish))
        .route(
            "/projects/{slug}/draft/metadata",
            patch(creator::metadata::update),
        )
        // The draft files path carries both the public read (owner-gated) and
        // the creator mutations; the literal segment takes priority over the
        // {revision} capture below.
        .route(
            "/projects/{slug}/draft/files/{*path}",
            get(public::files::download_draft)
                .put(creator::files::upload)
                .delete(creator::files::remove),
        )
        .route("/projects/{slug}/{revision}", get(public::projects::get_revision))
        .route(
            "/projects/{slug}/{revision}/files/{*path}",
            get(public::files::download),
        )
        .route(
            "/projects/{slug}/{revision}/report/{kind}",
            post(public::reports::report),
        )
        .route("/project-summaries", get(public::summaries::list))
        .route(
            "/project-latest-revisions",
            get(public::projects::latest_revisions),
        )
        .route(
            "/project-latest-revisions/{slug}",
            get(public::projects::latest_revision),
        )
        .route("/categories", get(public::other::categories))
        .route("/badges", get(public::other::badges))
        .route("/stats", get(public::other::stats))
        .route("/ping", get(public::other::ping))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v3", api_router())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_FILE_SIZE_BYTES))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
