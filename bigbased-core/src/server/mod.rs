//! Server initialization and routing

use crate::api;
use crate::cache::remote::KvRestClient;
use crate::cache::CacheManager;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::middleware::{
    path_guard_middleware, require_admin_token, route_guard_middleware,
    tenant_context_middleware, HttpMetricsLayer,
};
use crate::repository::{connect_lazy, domain::DomainRepositoryImpl};
use crate::service::{TenantResolver, VisitTracker};
use crate::state::HasTenancy;
use anyhow::Result;
use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub type ProductionResolver = TenantResolver<DomainRepositoryImpl, CacheManager>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tenant_resolver: Arc<ProductionResolver>,
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl HasTenancy for AppState {
    type DomainRepo = DomainRepositoryImpl;
    type Cache = CacheManager;

    fn tenant_resolver(&self) -> &ProductionResolver {
        &self.tenant_resolver
    }

    fn admin_api_token(&self) -> Option<&str> {
        self.config.admin_api_token.as_deref()
    }

    fn prometheus_handle(&self) -> Option<&PrometheusHandle> {
        self.prometheus_handle.as_ref()
    }
}

/// Wire the store and both cache tiers into a resolver.
///
/// Nothing here touches the network: the pool connects lazily and the KV
/// client is only built when fully configured.
pub fn build_resolver(config: &Config) -> Result<(ProductionResolver, CacheManager)> {
    let pool = connect_lazy(&config.database)?;
    let repo = Arc::new(DomainRepositoryImpl::new(pool));

    let remote = KvRestClient::from_config(&config.kv)?;
    if remote.is_none() {
        info!("KV REST store not configured, using in-process cache only");
    }
    let cache = CacheManager::new(remote, Arc::new(SystemClock))
        .with_domain_ttl(Duration::from_secs(config.tenancy.cache_ttl_secs));

    let resolver = TenantResolver::new(repo, Arc::new(cache.clone()), config.tenancy.clone());
    Ok((resolver, cache))
}

/// Run the HTTP server
pub async fn run(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Result<()> {
    let (mut resolver, cache) = build_resolver(&config)?;

    let _sweeper = cache.spawn_sweeper(Duration::from_secs(config.tenancy.sweep_interval_secs));

    if let Some(endpoint) = config.analytics.endpoint.clone() {
        info!(endpoint = %endpoint, "Visit tracking enabled");
        let (tracker, _delivery) = VisitTracker::spawn(endpoint);
        resolver = resolver.with_visit_tracker(tracker);
    }

    info!(
        enhanced_domains = config.tenancy.enhanced_domains_enabled,
        default_domain = %config.tenancy.default_domain,
        "Tenant resolution configured"
    );

    if config.admin_api_token.is_none() {
        info!("ADMIN_API_TOKEN not set, admin endpoints are disabled");
    }

    let http_addr = config.http_addr();
    let state = AppState {
        config: Arc::new(config),
        tenant_resolver: Arc::new(resolver),
        prometheus_handle,
    };

    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router with generic state type
///
/// Generic over the state so integration tests can drive the full
/// middleware stack against in-memory repositories.
pub fn build_router<S: HasTenancy>(state: S) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoints
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .route("/metrics", get(api::metrics::metrics_handler::<S>))
        // Tenant endpoints
        .route("/api/v1/tenant", get(api::tenant::current))
        .route("/api/v1/tenant/navigation", get(api::tenant::navigation))
        .route("/api/v1/tenant/routes/check", get(api::tenant::check_route))
        .route(
            "/api/v1/tenant/cache/{domain}",
            delete(api::tenant::invalidate_cache::<S>).route_layer(
                middleware::from_fn_with_state(state.clone(), require_admin_token::<S>),
            ),
        )
        .fallback(api::tenant::page_context)
        // Innermost first: the guard needs the context the tenant layer attaches
        .layer(middleware::from_fn(route_guard_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            tenant_context_middleware::<S>,
        ))
        .layer(middleware::from_fn(path_guard_middleware))
        .layer(HttpMetricsLayer)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
