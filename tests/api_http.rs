//! HTTP-level tests for the dashboard router (in-process, via `oneshot`).
//!
//! Covered:
//! - GET /health
//! - GET /dashboard from file fixtures: shape + ETag, stable across calls
//! - GET /dashboard with unreadable feeds and no history -> 503
//! - POST /dashboard/build: stateless build, sticky `previous`, 422 on bad shape

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    Router,
};
use http::{header, HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use park_dashboard::{create_router, AppState, DashboardState, FileFeedSource, Ranking};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn fixture_json(name: &str) -> Value {
    let s = std::fs::read_to_string(fixture(name)).expect("read fixture");
    serde_json::from_str(&s).expect("fixture is JSON")
}

fn app_with(newsletter: PathBuf, crowds: PathBuf) -> Router {
    let source = Arc::new(FileFeedSource::new(newsletter, crowds));
    create_router(AppState {
        dashboard: Arc::new(DashboardState::new(source, Ranking::default(), 300)),
    })
}

fn fixture_app() -> Router {
    app_with(
        fixture("newsletter-latest.json"),
        fixture("crowds-latest.json"),
    )
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = app.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, v)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let app = fixture_app();
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn dashboard_serves_model_from_files() {
    let app = fixture_app();
    let (status, headers, v) = send(&app, get("/dashboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ETAG).is_some());
    assert!(headers.get("x-dashboard-stale").is_none());

    assert_eq!(v["home"]["hotTiles"].as_array().unwrap().len(), 3);
    assert_eq!(v["home"]["parkSnapshots"][0]["park"], json!("MK"));
    assert_eq!(v["home"]["parkSnapshots"][3]["park"], json!("AK"));
    assert_eq!(v["home"]["mustSee"][0]["id"], json!("home-must-1"));
    assert!(v["parks"]["EPCOT"]["crowd"]["score"].is_number());
    assert_eq!(v["generatedAt"], json!("2025-09-06T08:00:00Z"));

    // Second call reuses the cached snapshot and keeps list order
    let (_, _, v2) = send(&app, get("/dashboard")).await;
    assert_eq!(v["home"]["topStories"], v2["home"]["topStories"]);

    let (status, _, _) = send(&app, get("/dashboard?force=1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn dashboard_without_feeds_is_unavailable() {
    let app = app_with(fixture("missing-newsletter.json"), fixture("crowds-latest.json"));
    let (status, _, v) = send(&app, get("/dashboard")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(v["error"].as_str().unwrap().contains("missing-newsletter.json"));
}

#[tokio::test]
async fn build_endpoint_is_stateless_and_sticky() {
    let app = fixture_app();
    let newsletter = fixture_json("newsletter-latest.json");
    let crowds = fixture_json("crowds-latest.json");

    let req = json!({
        "newsletter": newsletter,
        "crowds": crowds,
        "now": "2025-09-06T09:00:00Z"
    });
    let (status, h1, first) = send(&app, post_json("/dashboard/build", &req)).await;
    assert_eq!(status, StatusCode::OK);
    let order = first["home"]["topStories"].clone();
    assert_eq!(order[0]["id"], json!("story-4"));

    // Same request twice -> same fingerprint
    let (_, h2, _) = send(&app, post_json("/dashboard/build", &req)).await;
    assert_eq!(h1.get(header::ETAG), h2.get(header::ETAG));

    // Reordered pool + previous model -> order preserved
    let mut reordered = newsletter.clone();
    let stories = reordered["home"]["topStories"].as_array_mut().unwrap();
    stories.reverse();
    let req2 = json!({
        "newsletter": reordered,
        "crowds": crowds,
        "previous": first,
        "now": "2025-09-06T09:00:00Z"
    });
    let (status, _, second) = send(&app, post_json("/dashboard/build", &req2)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["home"]["topStories"], order);
}

#[tokio::test]
async fn build_endpoint_rejects_malformed_feeds() {
    let app = fixture_app();
    let mut newsletter = fixture_json("newsletter-latest.json");
    newsletter["home"]
        .as_object_mut()
        .unwrap()
        .remove("topStories");
    let req = json!({
        "newsletter": newsletter,
        "crowds": fixture_json("crowds-latest.json"),
    });
    let (status, _, v) = send(&app, post_json("/dashboard/build", &req)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(v["error"].as_str().unwrap().contains("topStories"));

    let bad_now = json!({
        "newsletter": fixture_json("newsletter-latest.json"),
        "crowds": fixture_json("crowds-latest.json"),
        "now": "noon-ish",
    });
    let (status, _, _) = send(&app, post_json("/dashboard/build", &bad_now)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}
