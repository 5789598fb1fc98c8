//! Application state traits for dependency injection
//!
//! Handlers and middleware are generic over [`HasTenancy`] so the same
//! router runs against the production state and in-memory test states.

use crate::cache::CacheOperations;
use crate::repository::DomainRepository;
use crate::service::TenantResolver;
use metrics_exporter_prometheus::PrometheusHandle;

pub trait HasTenancy: Clone + Send + Sync + 'static {
    /// The domain repository type
    type DomainRepo: DomainRepository + 'static;
    /// The cache implementation backing the resolver
    type Cache: CacheOperations + 'static;

    /// Get the tenant resolver
    fn tenant_resolver(&self) -> &TenantResolver<Self::DomainRepo, Self::Cache>;

    /// Bearer token accepted by admin endpoints; `None` disables them
    fn admin_api_token(&self) -> Option<&str> {
        None
    }

    /// Prometheus handle when metrics are enabled
    fn prometheus_handle(&self) -> Option<&PrometheusHandle> {
        None
    }
}
