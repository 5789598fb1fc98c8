//! Prometheus /metrics endpoint

use crate::state::HasTenancy;
use axum::{extract::State, http::StatusCode, response::IntoResponse};

/// GET /metrics in Prometheus text exposition format
pub async fn metrics_handler<S: HasTenancy>(State(state): State<S>) -> impl IntoResponse {
    match state.prometheus_handle() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (StatusCode::NOT_FOUND, "Metrics not enabled".to_string()),
    }
}
