use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use crate::{metrics, server::AppState};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BannedResponse {
    pub login: String,
    pub banned: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub loaded: bool,
    pub count: usize,
    pub cache_age_seconds: f64,
    pub fetched_at: String,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready once the first refresh has succeeded.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.registry.is_loaded() {
        (StatusCode::OK, Json(HealthResponse { status: "ready" }))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse { status: "warming" }),
        )
    }
}

pub async fn banned(
    State(state): State<AppState>,
    Path(login): Path<String>,
) -> Json<BannedResponse> {
    let banned = state.registry.is_banned(&login);
    if state.lookup_sampler.sample() {
        tracing::debug!(
            login = %login,
            banned,
            every = state.lookup_sampler.modulo(),
            "Sampled banned user lookup"
        );
    }
    Json(BannedResponse { login, banned })
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.registry.snapshot();
    Json(StatusResponse {
        loaded: snapshot.is_loaded(),
        count: snapshot.len(),
        cache_age_seconds: snapshot.age().as_secs_f64(),
        fetched_at: snapshot.fetched_at_utc().format(&Rfc3339).unwrap_or_default(),
    })
}

pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match metrics::render(state.registry.metrics()) {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response(),
    }
}
