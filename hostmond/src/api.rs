use crate::alerts::Thresholds;
use crate::history::HistoryBuffer;
use crate::types::Metrics;
use crate::ui;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::warn;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub history: Arc<HistoryBuffer>,
    pub chart_path: PathBuf,
    pub thresholds: Thresholds,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/metrics", get(metrics_handler))
        .route("/chart.svg", get(chart_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}

async fn dashboard_handler(State(state): State<AppState>) -> Html<String> {
    ui::render(&state.thresholds)
}

async fn metrics_handler(State(state): State<AppState>) -> Json<Vec<Metrics>> {
    Json(state.history.snapshot_list())
}

async fn chart_handler(State(state): State<AppState>) -> Response {
    match tokio::fs::read(&state.chart_path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/svg+xml")], bytes).into_response(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "chart not rendered yet").into_response()
        }
        Err(err) => {
            warn!(
                "[api] failed to read chart {}: {}",
                state.chart_path.display(),
                err
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn healthz_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
