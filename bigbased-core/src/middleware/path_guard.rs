//! Dot-segment guard
//!
//! Rejects request paths containing `.` or `..` segments, including
//! percent-encoded ones, before any tenant or route logic sees them.

use crate::error::AppError;
use crate::policy::decode_path;
use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Returns `true` if any decoded path segment is `.` or `..`
pub fn has_dot_segments(path: &str) -> bool {
    decode_path(path)
        .split(['/', '\\'])
        .any(|seg| seg == "." || seg == "..")
}

pub async fn path_guard_middleware(request: Request<Body>, next: Next) -> Response {
    if has_dot_segments(request.uri().path()) {
        return AppError::BadRequest("Path must not contain dot segments".to_string())
            .into_response();
    }
    next.run(request).await
}
