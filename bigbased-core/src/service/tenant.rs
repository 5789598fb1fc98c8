//! Tenant configuration resolution
//!
//! Resolution is on the request hot path and must always produce a usable
//! config. Each layer (cache, store) yields an `Option`; failures are logged
//! and read as `None`, and the chain coalesces to the hardcoded default.

use crate::cache::CacheOperations;
use crate::config::TenancyConfig;
use crate::domain::{parse_domain_or, DomainConfig};
use crate::repository::DomainRepository;
use crate::service::analytics::VisitTracker;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct TenantResolver<R: DomainRepository, C: CacheOperations> {
    repo: Arc<R>,
    cache: Arc<C>,
    config: TenancyConfig,
    visit_tracker: Option<VisitTracker>,
}

impl<R: DomainRepository, C: CacheOperations> TenantResolver<R, C> {
    pub fn new(repo: Arc<R>, cache: Arc<C>, config: TenancyConfig) -> Self {
        Self {
            repo,
            cache,
            config,
            visit_tracker: None,
        }
    }

    pub fn with_visit_tracker(mut self, tracker: VisitTracker) -> Self {
        self.visit_tracker = Some(tracker);
        self
    }

    pub fn config(&self) -> &TenancyConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Canonical form of a raw host, using the configured default domain
    pub fn canonical_domain(&self, hostname: &str) -> String {
        parse_domain_or(hostname, &self.config.default_domain)
    }

    /// Resolve the tenant for a raw `Host` value. Never fails.
    pub async fn resolve(&self, hostname: &str) -> DomainConfig {
        let domain = self.canonical_domain(hostname);

        if !self.config.enhanced_domains_enabled {
            counter!("bigbased_tenant_resolutions_total", "source" => "disabled").increment(1);
            return DomainConfig::fallback(&domain);
        }

        if let Some(cached) = self.from_cache(&domain).await {
            counter!("bigbased_tenant_resolutions_total", "source" => "cache").increment(1);
            return cached;
        }

        if let Some(stored) = self.from_store(&domain).await {
            counter!("bigbased_tenant_resolutions_total", "source" => "store").increment(1);
            self.remember(&stored).await;
            return stored;
        }

        counter!("bigbased_tenant_resolutions_total", "source" => "fallback").increment(1);
        debug!(domain = %domain, "No active tenant, serving default config");
        DomainConfig::fallback(&domain)
    }

    /// Resolve and record a visit for persisted tenants without waiting on it
    pub async fn resolve_and_track(&self, hostname: &str) -> DomainConfig {
        let config = self.resolve(hostname).await;
        if let Some(tracker) = &self.visit_tracker {
            if !config.is_default() {
                tracker.track_visit(config.id);
            }
        }
        config
    }

    /// Drop the cached config for a host after its tenant has been changed
    pub async fn invalidate(&self, hostname: &str) -> String {
        let domain = self.canonical_domain(hostname);
        if let Err(e) = self.cache.invalidate_domain_config(&domain).await {
            warn!(domain = %domain, error = %e, "Failed to invalidate cached domain config");
        }
        domain
    }

    async fn from_cache(&self, domain: &str) -> Option<DomainConfig> {
        match self.cache.get_domain_config(domain).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(domain = %domain, error = %e, "Domain cache lookup failed");
                None
            }
        }
    }

    async fn from_store(&self, domain: &str) -> Option<DomainConfig> {
        match self.repo.find_active_by_domain(domain).await {
            Ok(found) => found.filter(|config| config.is_active),
            Err(e) => {
                warn!(domain = %domain, error = %e, "Domain lookup failed");
                None
            }
        }
    }

    async fn remember(&self, config: &DomainConfig) {
        if let Err(e) = self.cache.set_domain_config(config).await {
            warn!(domain = %config.domain, error = %e, "Failed to cache domain config");
        }
    }
}
