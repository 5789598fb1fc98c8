//! HTTP request metrics
//!
//! Implemented as a Tower Layer/Service so it wraps the whole router,
//! including the tenant middleware and route guard rejections.

use axum::{body::Body, http::Request, response::Response};
use metrics::{counter, gauge, histogram};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};

const CACHE_ROUTE_PREFIX: &str = "/api/v1/tenant/cache/";

#[derive(Clone)]
pub struct HttpMetricsLayer;

impl<S> Layer<S> for HttpMetricsLayer {
    type Service = HttpMetricsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpMetricsMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct HttpMetricsMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for HttpMetricsMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = request.method().to_string();
        let path = path_label(request.uri().path());

        gauge!("bigbased_http_requests_in_flight").increment(1.0);
        let start = Instant::now();

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let result = inner.call(request).await;
            gauge!("bigbased_http_requests_in_flight").decrement(1.0);

            let response = result?;
            let status = response.status().as_u16().to_string();
            counter!(
                "bigbased_http_requests_total",
                "method" => method.clone(),
                "path" => path.clone(),
                "status" => status
            )
            .increment(1);
            histogram!(
                "bigbased_http_request_duration_seconds",
                "method" => method,
                "path" => path
            )
            .record(start.elapsed().as_secs_f64());

            Ok(response)
        })
    }
}

/// Bound label cardinality: tenant pages share one label and the cache
/// route's domain segment is collapsed.
fn path_label(path: &str) -> String {
    if path.starts_with(CACHE_ROUTE_PREFIX) {
        return format!("{}{{domain}}", CACHE_ROUTE_PREFIX);
    }
    if path.starts_with("/api/") || matches!(path, "/health" | "/ready" | "/metrics") {
        return path.to_string();
    }
    "{page}".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_label_keeps_api_routes() {
        assert_eq!(path_label("/api/v1/tenant"), "/api/v1/tenant");
        assert_eq!(path_label("/health"), "/health");
    }

    #[test]
    fn test_path_label_collapses_cache_domain() {
        assert_eq!(
            path_label("/api/v1/tenant/cache/basedbook.com"),
            "/api/v1/tenant/cache/{domain}"
        );
    }

    #[test]
    fn test_path_label_collapses_pages() {
        assert_eq!(path_label("/library/some-book"), "{page}");
        assert_eq!(path_label("/"), "{page}");
    }
}
