use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use hatchery::content::ContentStore;
use hatchery::server::{AppState, create_router};
use hatchery::store::{SqliteStore, Store};

const ALICE: &str = "alice";
const BOB: &str = "bob";

struct TestApp {
    _temp: TempDir,
    router: Router,
    store: Arc<dyn Store>,
}

fn test_app() -> TestApp {
    let temp = TempDir::new().unwrap();
    let store = SqliteStore::new(temp.path().join("hatchery.db")).unwrap();
    store.initialize().unwrap();
    let store: Arc<dyn Store> = Arc::new(store);

    let state = Arc::new(AppState {
        store: store.clone(),
        content: Arc::new(ContentStore::new(temp.path())),
        base_url: None,
        badges: vec!["mch2022".to_string(), "why2025".to_string()],
        categories: vec!["Games".to_string(), "Silly".to_string()],
    });

    TestApp {
        _temp: temp,
        router: create_router(state),
        store,
    }
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-forwarded-user", user);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn send_raw(app: &TestApp, req: Request<Body>) -> axum::response::Response {
    app.router.clone().oneshot(req).await.unwrap()
}

async fn create_project(app: &TestApp, user: &str, slug: &str) {
    let (status, _) = send(
        app,
        request("POST", &format!("/api/v3/projects/{slug}"), Some(user), None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn upload_file(app: &TestApp, user: &str, slug: &str, path: &str, content: &[u8]) {
    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/v3/projects/{slug}/draft/files/{path}"))
        .header("x-forwarded-user", user)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(content.to_vec()))
        .unwrap();
    let (status, _) = send(app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

async fn publish(app: &TestApp, user: &str, slug: &str) {
    let (status, _) = send(
        app,
        request(
            "POST",
            &format!("/api/v3/projects/{slug}/publish"),
            Some(user),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

async fn set_metadata(app: &TestApp, user: &str, slug: &str, metadata: Value) {
    let (status, _) = send(
        app,
        request(
            "PATCH",
            &format!("/api/v3/projects/{slug}/draft/metadata"),
            Some(user),
            Some(metadata),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let response = send_raw(&app, request("GET", "/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_publish_lifecycle_over_http() {
    let app = test_app();
    create_project(&app, ALICE, "codecraft").await;

    upload_file(&app, ALICE, "codecraft", "metadata.json", b"{\"name\":\"CodeCraft\"}").await;
    upload_file(&app, ALICE, "codecraft", "__init__.py", b"print('hi')").await;

    // Nothing published yet: latest and rev0 are invisible.
    let (status, _) = send(&app, request("GET", "/api/v3/projects/codecraft", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        request("GET", "/api/v3/projects/codecraft/rev0", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    publish(&app, ALICE, "codecraft").await;

    let (status, body) =
        send(&app, request("GET", "/api/v3/projects/codecraft", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["version"]["revision"], 0);
    assert_eq!(body["data"]["version"]["files"].as_array().unwrap().len(), 2);

    // rev0 serves the same version as latest.
    let (status, rev0) = send(
        &app,
        request("GET", "/api/v3/projects/codecraft/rev0", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rev0["data"]["version"], body["data"]["version"]);

    // The new draft is revision 1 and inherited both files.
    let (status, draft) = send(
        &app,
        request("GET", "/api/v3/projects/codecraft/draft", Some(ALICE), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["data"]["version"]["revision"], 1);
    assert_eq!(
        draft["data"]["version"]["files"].as_array().unwrap().len(),
        2
    );

    // Revision 1 is the unpublished draft: unreachable by number.
    let (status, _) = send(
        &app,
        request("GET", "/api/v3/projects/codecraft/rev1", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Publishing again without edits works and advances the numbers.
    publish(&app, ALICE, "codecraft").await;
    let (status, body) = send(
        &app,
        request("GET", "/api/v3/project-latest-revisions/codecraft", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], 1);
}

#[tokio::test]
async fn test_file_download_headers_and_content() {
    let app = test_app();
    create_project(&app, ALICE, "filetest").await;
    upload_file(&app, ALICE, "filetest", "main.py", b"import badge").await;
    publish(&app, ALICE, "filetest").await;

    let response = send_raw(
        &app,
        request(
            "GET",
            "/api/v3/projects/filetest/rev0/files/main.py",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"main.py\""
    );
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    // Published revisions are immutable and cacheable forever.
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "public, max-age=31536000, immutable"
    );
    assert!(headers.contains_key(header::ETAG));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"import badge");

    // The moving aliases must not be cached.
    let response = send_raw(
        &app,
        request(
            "GET",
            "/api/v3/projects/filetest/latest/files/main.py",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let response = send_raw(
        &app,
        request(
            "GET",
            "/api/v3/projects/filetest/draft/files/main.py",
            Some(ALICE),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
}

#[tokio::test]
async fn test_draft_is_private() {
    let app = test_app();
    create_project(&app, ALICE, "secretive").await;
    upload_file(&app, ALICE, "secretive", "wip.py", b"unfinished").await;

    // Anonymous: 401; another user: 403.
    let (status, _) = send(
        &app,
        request("GET", "/api/v3/projects/secretive/draft", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request("GET", "/api/v3/projects/secretive/draft", Some(BOB), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            "GET",
            "/api/v3/projects/secretive/draft/files/wip.py",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Mutations from a non-owner are rejected too.
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/v3/projects/secretive/publish",
            Some(BOB),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request("DELETE", "/api/v3/projects/secretive", Some(BOB), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_project_validation_and_conflicts() {
    let app = test_app();

    // Identity is required for any mutation.
    let (status, _) = send(&app, request("POST", "/api/v3/projects/newapp", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    create_project(&app, ALICE, "newapp").await;

    let (status, _) = send(
        &app,
        request("POST", "/api/v3/projects/newapp", Some(BOB), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        request("POST", "/api/v3/projects/Bad-Slug", Some(ALICE), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("slug"));
}

#[tokio::test]
async fn test_summaries_filters_and_hidden() {
    let app = test_app();

    create_project(&app, ALICE, "codecraft").await;
    set_metadata(
        &app,
        ALICE,
        "codecraft",
        json!({
            "name": "CodeCraft",
            "description": "With CodeCraft, you can do interesting things with the sensors.",
            "categories": ["Games", "Silly"],
            "badges": ["mch2022", "why2025"],
            "icon_map": { "64x64": "icon5.png" }
        }),
    )
    .await;
    publish(&app, ALICE, "codecraft").await;

    create_project(&app, BOB, "sneaky").await;
    set_metadata(
        &app,
        BOB,
        "sneaky",
        json!({ "name": "Sneaky", "categories": ["Silly"], "hidden": true }),
    )
    .await;
    publish(&app, BOB, "sneaky").await;

    // Unpublished projects never show up.
    create_project(&app, ALICE, "unfinished").await;

    let (status, body) = send(&app, request("GET", "/api/v3/project-summaries", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let slugs: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["codecraft"]);

    // Icon URLs are revision-addressed.
    let icon_url = body["data"][0]["icon_map"]["64x64"]["url"].as_str().unwrap();
    assert_eq!(icon_url, "/api/v3/projects/codecraft/rev0/files/icon5.png");

    let (status, body) = send(
        &app,
        request("GET", "/api/v3/project-summaries?category=Silly", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        request(
            "GET",
            "/api/v3/project-summaries?badge=why2025&search=interesting%20things",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["slug"], "codecraft");

    // A direct slug lookup bypasses the hidden filter.
    let (status, body) = send(
        &app,
        request("GET", "/api/v3/project-summaries?slugs=sneaky", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["slug"], "sneaky");
    assert_eq!(body["data"][0]["hidden"], true);

    // Caller errors: unknown sort key, overlong search.
    let (status, _) = send(
        &app,
        request("GET", "/api/v3/project-summaries?sort=bogus", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let long_search = "x".repeat(60);
    let (status, _) = send(
        &app,
        request(
            "GET",
            &format!("/api/v3/project-summaries?search={long_search}"),
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_draft_file_delete_preserves_published() {
    let app = test_app();
    create_project(&app, ALICE, "careful").await;
    upload_file(&app, ALICE, "careful", "keep.py", b"keep").await;
    upload_file(&app, ALICE, "careful", "gone.py", b"gone").await;
    publish(&app, ALICE, "careful").await;

    let (status, _) = send(
        &app,
        request(
            "DELETE",
            "/api/v3/projects/careful/draft/files/gone.py",
            Some(ALICE),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Deleting again is a 404: the row is already gone from the draft's view.
    let (status, _) = send(
        &app,
        request(
            "DELETE",
            "/api/v3/projects/careful/draft/files/gone.py",
            Some(ALICE),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, draft) = send(
        &app,
        request("GET", "/api/v3/projects/careful/draft", Some(ALICE), None),
    )
    .await;
    let draft_files: Vec<&str> = draft["data"]["version"]["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["full_path"].as_str().unwrap())
        .collect();
    assert_eq!(draft_files, vec!["keep.py"]);

    // The published revision still serves the deleted path.
    let response = send_raw(
        &app,
        request(
            "GET",
            "/api/v3/projects/careful/rev0/files/gone.py",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reupload_same_bytes_is_idempotent() {
    let app = test_app();
    create_project(&app, ALICE, "stable").await;

    upload_file(&app, ALICE, "stable", "app.py", b"same content").await;
    let (_, before) = send(
        &app,
        request("GET", "/api/v3/projects/stable/draft", Some(ALICE), None),
    )
    .await;
    let sha_before = before["data"]["version"]["files"][0]["sha256"]
        .as_str()
        .unwrap()
        .to_string();

    upload_file(&app, ALICE, "stable", "app.py", b"same content").await;
    let (_, after) = send(
        &app,
        request("GET", "/api/v3/projects/stable/draft", Some(ALICE), None),
    )
    .await;
    assert_eq!(after["data"]["version"]["files"].as_array().unwrap().len(), 1);
    assert_eq!(
        after["data"]["version"]["files"][0]["sha256"].as_str().unwrap(),
        sha_before
    );
}

#[tokio::test]
async fn test_metadata_edits_do_not_touch_published() {
    let app = test_app();
    create_project(&app, ALICE, "renamer").await;
    set_metadata(&app, ALICE, "renamer", json!({ "name": "Before" })).await;
    publish(&app, ALICE, "renamer").await;

    set_metadata(&app, ALICE, "renamer", json!({ "name": "After" })).await;

    let (_, latest) = send(&app, request("GET", "/api/v3/projects/renamer", None, None)).await;
    assert_eq!(latest["data"]["version"]["app_metadata"]["name"], "Before");

    let (_, draft) = send(
        &app,
        request("GET", "/api/v3/projects/renamer/draft", Some(ALICE), None),
    )
    .await;
    assert_eq!(draft["data"]["version"]["app_metadata"]["name"], "After");
}

#[tokio::test]
async fn test_latest_revisions_listing() {
    let app = test_app();
    create_project(&app, ALICE, "appone").await;
    publish(&app, ALICE, "appone").await;
    publish(&app, ALICE, "appone").await;
    create_project(&app, ALICE, "apptwo").await;
    publish(&app, ALICE, "apptwo").await;
    create_project(&app, ALICE, "neverpub").await;

    let (status, body) = send(
        &app,
        request("GET", "/api/v3/project-latest-revisions", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "appone": 1, "apptwo": 0 }));

    let (status, body) = send(
        &app,
        request(
            "GET",
            "/api/v3/project-latest-revisions?slugs=apptwo,neverpub",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "apptwo": 0 }));

    let (status, _) = send(
        &app,
        request("GET", "/api/v3/project-latest-revisions/neverpub", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ping_stats_and_vocabulary() {
    let app = test_app();
    create_project(&app, ALICE, "statapp").await;

    let response = send_raw(
        &app,
        request("GET", "/api/v3/ping?id=badge-1&mac=aa:bb", None, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(&app, request("GET", "/api/v3/stats", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["apps"], 1);
    assert_eq!(body["data"]["app_authors"], 1);
    assert_eq!(body["data"]["badges"], 1);

    let (status, body) = send(&app, request("GET", "/api/v3/badges", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(["mch2022", "why2025"]));

    let (status, body) = send(&app, request("GET", "/api/v3/categories", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(["Games", "Silly"]));
}

#[tokio::test]
async fn test_install_reports_feed_sorting() {
    let app = test_app();
    for slug in ["popular", "niche"] {
        create_project(&app, ALICE, slug).await;
        publish(&app, ALICE, slug).await;
    }

    for badge in ["badge-a", "badge-b"] {
        let (status, _) = send(
            &app,
            request(
                "POST",
                &format!("/api/v3/projects/popular/rev0/report/install?id={badge}"),
                None,
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/v3/projects/niche/rev0/report/install?id=badge-a",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Reports against invisible revisions are 404s.
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/v3/projects/popular/rev9/report/install?id=badge-a",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The aggregate is rebuilt out of band, then the listing can sort on it.
    app.store.refresh_install_counts().unwrap();

    let (status, body) = send(
        &app,
        request("GET", "/api/v3/project-summaries?sort=installs", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data[0]["slug"], "popular");
    assert_eq!(data[0]["installs"], 2);
    assert_eq!(data[1]["slug"], "niche");
    assert_eq!(data[1]["installs"], 1);
}

#[tokio::test]
async fn test_deleted_project_disappears() {
    let app = test_app();
    create_project(&app, ALICE, "shortlived").await;
    publish(&app, ALICE, "shortlived").await;

    let (status, _) = send(
        &app,
        request("DELETE", "/api/v3/projects/shortlived", Some(ALICE), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for uri in [
        "/api/v3/projects/shortlived",
        "/api/v3/projects/shortlived/rev0",
        "/api/v3/projects/shortlived/latest",
    ] {
        let (status, _) = send(&app, request("GET", uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri} should be gone");
    }

    let (_, body) = send(&app, request("GET", "/api/v3/project-summaries", None, None)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
