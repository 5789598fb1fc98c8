//! HTTP middleware

pub mod admin_auth;
pub mod metrics;
pub mod path_guard;
pub mod tenant;

pub use admin_auth::require_admin_token;
pub use metrics::HttpMetricsLayer;
pub use path_guard::path_guard_middleware;
pub use tenant::{
    request_host, route_guard_middleware, tenant_context_middleware, TenantContext,
};
