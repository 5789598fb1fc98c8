//! Bearer-token enforcement for admin endpoints
//!
//! Admin routes mutate shared state (cache invalidation), so they require
//! `Authorization: Bearer <ADMIN_API_TOKEN>`. With no token configured every
//! request is rejected.

use crate::error::AppError;
use crate::state::HasTenancy;
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Compare without short-circuiting on the first differing byte
fn tokens_match(expected: &str, provided: &str) -> bool {
    let (a, b) = (expected.as_bytes(), provided.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn unauthorized(message: &str) -> Response {
    AppError::Unauthorized(message.to_string()).into_response()
}

pub async fn require_admin_token<S: HasTenancy>(
    State(state): State<S>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_api_token() else {
        return unauthorized("Admin API is disabled");
    };

    let auth_header = match request.headers().get(AUTHORIZATION) {
        Some(header) => header,
        None => return unauthorized("Missing authorization token"),
    };

    let token = match auth_header.to_str().ok().and_then(|s| s.strip_prefix("Bearer ")) {
        Some(t) => t.trim(),
        None => return unauthorized("Authorization header must use Bearer scheme"),
    };

    if !tokens_match(expected, token) {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request with invalid token");
        return unauthorized("Invalid admin token");
    }

    next.run(request).await
}
