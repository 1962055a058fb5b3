use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::builder::build_render_model;
use crate::feed::{crowds_from_value, newsletter_from_value};
use crate::model::RenderModel;
use crate::refresh::DashboardState;
use crate::scoring::parse_ts;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<DashboardState>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/build", post(build_dashboard))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn error_json(status: StatusCode, msg: String) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

fn model_response(model: &RenderModel, stale: bool) -> Response {
    let etag = format!("\"{}\"", model.fingerprint());
    let mut resp = Json(model).into_response();
    if let Ok(v) = HeaderValue::from_str(&etag) {
        resp.headers_mut().insert(header::ETAG, v);
    }
    if stale {
        resp.headers_mut()
            .insert("x-dashboard-stale", HeaderValue::from_static("1"));
    }
    resp
}

fn flag(q: &HashMap<String, String>, key: &str) -> bool {
    q.get(key)
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

async fn get_dashboard(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let force = flag(&q, "force");
    match state.dashboard.refresh(force, Utc::now()).await {
        Ok(r) => model_response(&r.model, r.stale),
        Err(e) => {
            tracing::warn!(target: "dashboard", "GET /dashboard unavailable: {e:#}");
            error_json(StatusCode::SERVICE_UNAVAILABLE, format!("{e:#}"))
        }
    }
}

#[derive(serde::Deserialize)]
struct BuildReq {
    newsletter: Value,
    crowds: Value,
    #[serde(default)]
    previous: Option<RenderModel>,
    /// RFC 3339; server clock when absent.
    #[serde(default)]
    now: Option<String>,
}

/// Stateless build: validates both snapshots, then runs the builder once.
async fn build_dashboard(State(state): State<AppState>, Json(body): Json<BuildReq>) -> Response {
    let newsletter = match newsletter_from_value(body.newsletter) {
        Ok(n) => n,
        Err(e) => return error_json(StatusCode::UNPROCESSABLE_ENTITY, format!("{e:#}")),
    };
    let crowds = match crowds_from_value(body.crowds) {
        Ok(c) => c,
        Err(e) => return error_json(StatusCode::UNPROCESSABLE_ENTITY, format!("{e:#}")),
    };
    let now = match body.now.as_deref() {
        None => Utc::now(),
        Some(s) => match parse_ts(s) {
            Some(t) => t,
            None => {
                return error_json(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("`now` is not an RFC 3339 timestamp: {s}"),
                )
            }
        },
    };

    let model = build_render_model(
        &newsletter,
        &crowds,
        body.previous.as_ref(),
        now,
        state.dashboard.ranking(),
    );
    model_response(&model, false)
}
