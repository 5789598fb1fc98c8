//! Tenant context and route guard middleware

use crate::domain::DomainConfig;
use crate::error::AppError;
use crate::policy::is_route_allowed;
use crate::state::HasTenancy;
use axum::{
    body::Body,
    extract::State,
    http::{header::HOST, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

const FORWARDED_HOST: &str = "x-forwarded-host";

/// Operational endpoints that never need a tenant
const OPERATIONAL_PATHS: &[&str] = &["/health", "/ready", "/metrics"];

/// Paths served to every tenant regardless of variant
const EXEMPT_PREFIXES: &[&str] = &["/api/", "/health", "/ready", "/metrics"];

/// Resolved tenant attached to each request
#[derive(Debug, Clone)]
pub struct TenantContext(pub Arc<DomainConfig>);

impl std::ops::Deref for TenantContext {
    type Target = DomainConfig;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Host the client asked for: first `X-Forwarded-Host` value, then `Host`
pub fn request_host(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get(FORWARDED_HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| headers.get(HOST).and_then(|v| v.to_str().ok()))
        .unwrap_or_default()
        .to_string()
}

/// Resolve the tenant for the request host and attach it as [`TenantContext`].
/// Page requests of persisted tenants are queued as visits without waiting;
/// API calls resolve without tracking.
pub async fn tenant_context_middleware<S: HasTenancy>(
    State(state): State<S>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if OPERATIONAL_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let host = request_host(request.headers());
    let resolver = state.tenant_resolver();
    let config = if request.uri().path().starts_with("/api/") {
        resolver.resolve(&host).await
    } else {
        resolver.resolve_and_track(&host).await
    };
    request
        .extensions_mut()
        .insert(TenantContext(Arc::new(config)));
    next.run(request).await
}

fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Hide routes that belong to another site variant behind a 404
pub async fn route_guard_middleware(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path();
    if !is_exempt(path) {
        if let Some(tenant) = request.extensions().get::<TenantContext>() {
            if !is_route_allowed(tenant, path) {
                tracing::debug!(
                    domain = %tenant.domain,
                    path = %path,
                    "Route not available for tenant"
                );
                return AppError::NotFound(format!("No route for {}", path)).into_response();
            }
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_host_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("internal:8080"));
        headers.insert(
            FORWARDED_HOST,
            HeaderValue::from_static("basedbook.com, proxy.internal"),
        );
        assert_eq!(request_host(&headers), "basedbook.com");
    }

    #[test]
    fn test_request_host_falls_back_to_host() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("bigbased.com:443"));
        headers.insert(FORWARDED_HOST, HeaderValue::from_static(" "));
        assert_eq!(request_host(&headers), "bigbased.com:443");
    }

    #[test]
    fn test_request_host_missing() {
        assert_eq!(request_host(&HeaderMap::new()), "");
    }

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/api/v1/tenant"));
        assert!(is_exempt("/health"));
        assert!(!is_exempt("/library"));
        assert!(!is_exempt("/"));
    }
}
