//! Health check endpoints

use crate::repository::DomainRepository;
use crate::state::HasTenancy;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint. The cache tiers are optional and never gate
/// readiness; only the domain store does.
pub async fn ready<S: HasTenancy>(State(state): State<S>) -> impl IntoResponse {
    match state.tenant_resolver().repository().ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
        }
    }
}
