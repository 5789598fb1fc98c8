//! Shared test infrastructure
//!
//! Everything here runs without external services: an in-memory domain
//! repository, a memory-only cache on a manual clock, and a state type that
//! plugs both into the production router.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use bigbased_core::cache::CacheManager;
use bigbased_core::clock::ManualClock;
use bigbased_core::config::TenancyConfig;
use bigbased_core::domain::{DomainConfig, SiteType};
use bigbased_core::error::{AppError, Result};
use bigbased_core::repository::DomainRepository;
use bigbased_core::server::build_router;
use bigbased_core::service::{TenantResolver, VisitTracker};
use bigbased_core::state::HasTenancy;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

/// Fixed start instant for manual clocks
pub const T0: i64 = 1_700_000_000_000;

/// Admin token configured on [`TestAppState`]
pub const ADMIN_TOKEN: &str = "test-admin-token";

// ============================================================================
// Test repository
// ============================================================================

pub struct TestDomainRepository {
    domains: RwLock<Vec<DomainConfig>>,
    lookups: AtomicUsize,
    failing: AtomicBool,
}

impl TestDomainRepository {
    pub fn new() -> Self {
        Self {
            domains: RwLock::new(vec![]),
            lookups: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub async fn add_domain(&self, config: DomainConfig) {
        self.domains.write().await.push(config);
    }

    /// Apply `update` to the stored row for `domain`
    pub async fn update_domain<F: FnOnce(&mut DomainConfig)>(&self, domain: &str, update: F) {
        if let Some(config) = self
            .domains
            .write()
            .await
            .iter_mut()
            .find(|c| c.domain == domain)
        {
            update(config);
        }
    }

    /// Make every call fail as an unreachable database would
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl Default for TestDomainRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DomainRepository for TestDomainRepository {
    async fn find_active_by_domain(&self, domain: &str) -> Result<Option<DomainConfig>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .domains
            .read()
            .await
            .iter()
            .find(|c| c.domain == domain && c.is_active)
            .cloned())
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn tenant(id: i64, domain: &str, site_type: SiteType) -> DomainConfig {
    DomainConfig {
        id,
        domain: domain.to_string(),
        site_type,
        is_active: true,
        custom_branding: serde_json::Map::new(),
        owner_user_id: Some(format!("user-{}", id)),
        settings: HashMap::new(),
    }
}

pub fn enabled_tenancy() -> TenancyConfig {
    TenancyConfig {
        enhanced_domains_enabled: true,
        ..TenancyConfig::default()
    }
}

pub fn memory_cache(clock: &ManualClock) -> CacheManager {
    CacheManager::new(None, Arc::new(clock.clone()))
}

// ============================================================================
// Test state
// ============================================================================

#[derive(Clone)]
pub struct TestAppState {
    pub resolver: Arc<TenantResolver<TestDomainRepository, CacheManager>>,
    pub repo: Arc<TestDomainRepository>,
    pub cache: Arc<CacheManager>,
    pub clock: ManualClock,
    pub admin_token: Option<String>,
}

impl TestAppState {
    pub fn new(tenancy: TenancyConfig) -> Self {
        Self::build(tenancy, None)
    }

    /// State whose resolver reports visits to `tracker`
    pub fn with_visit_tracker(tenancy: TenancyConfig, tracker: VisitTracker) -> Self {
        Self::build(tenancy, Some(tracker))
    }

    fn build(tenancy: TenancyConfig, tracker: Option<VisitTracker>) -> Self {
        let clock = ManualClock::new(T0);
        let repo = Arc::new(TestDomainRepository::new());
        let cache = Arc::new(memory_cache(&clock));
        let mut resolver = TenantResolver::new(repo.clone(), cache.clone(), tenancy);
        if let Some(tracker) = tracker {
            resolver = resolver.with_visit_tracker(tracker);
        }
        Self {
            resolver: Arc::new(resolver),
            repo,
            cache,
            clock,
            admin_token: Some(ADMIN_TOKEN.to_string()),
        }
    }

    pub fn enabled() -> Self {
        Self::new(enabled_tenancy())
    }

    pub fn router(&self) -> Router {
        build_router(self.clone())
    }
}

impl HasTenancy for TestAppState {
    type DomainRepo = TestDomainRepository;
    type Cache = CacheManager;

    fn tenant_resolver(&self) -> &TenantResolver<Self::DomainRepo, Self::Cache> {
        &self.resolver
    }

    fn admin_api_token(&self) -> Option<&str> {
        self.admin_token.as_deref()
    }
}

// ============================================================================
// HTTP helpers
// ============================================================================

/// Send a request for `host` and return the status plus raw body
pub async fn send(app: &Router, method: Method, host: &str, path: &str) -> (StatusCode, Vec<u8>) {
    send_with_headers(app, method, host, path, &[]).await
}

/// Like [`send`], with extra request headers
pub async fn send_with_headers(
    app: &Router,
    method: Method,
    host: &str,
    path: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(path).header("Host", host);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::empty()).unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    (status, body.to_vec())
}

/// GET `path` as `host` and parse a JSON body
pub async fn get_json<T: DeserializeOwned>(
    app: &Router,
    host: &str,
    path: &str,
) -> (StatusCode, Option<T>) {
    let (status, body) = send(app, Method::GET, host, path).await;
    if body.is_empty() {
        return (status, None);
    }
    (status, serde_json::from_slice(&body).ok())
}
