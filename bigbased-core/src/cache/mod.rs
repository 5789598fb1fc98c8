//! Two-tier cache layer
//!
//! The remote KV store is consulted first when configured; the in-process
//! map is always written. Caching is an optimisation only: remote failures
//! are logged and read as misses, never returned to the caller.

pub mod memory;
pub mod remote;

use crate::clock::Clock;
use crate::domain::DomainConfig;
use crate::error::Result;
use async_trait::async_trait;
use memory::MemoryCache;
use metrics::{counter, gauge};
use remote::KvRestClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Cache key prefixes
mod keys {
    pub const DOMAIN_CONFIG: &str = "bigbased:domain";
}

/// Default TTLs
mod ttl {
    pub const DOMAIN_CONFIG_SECS: u64 = 300; // 5 minutes
}

/// Default interval between memory sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

pub fn domain_config_key(domain: &str) -> String {
    format!("{}:{}", keys::DOMAIN_CONFIG, domain)
}

/// Typed cache operations used by the tenant resolver
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheOperations: Send + Sync {
    async fn get_domain_config(&self, domain: &str) -> Result<Option<DomainConfig>>;
    async fn set_domain_config(&self, config: &DomainConfig) -> Result<()>;
    async fn invalidate_domain_config(&self, domain: &str) -> Result<()>;
}

/// Remote + memory cache manager
#[derive(Clone)]
pub struct CacheManager {
    remote: Option<KvRestClient>,
    memory: MemoryCache,
    domain_ttl: Duration,
}

impl CacheManager {
    pub fn new(remote: Option<KvRestClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            remote,
            memory: MemoryCache::new(clock),
            domain_ttl: Duration::from_secs(ttl::DOMAIN_CONFIG_SECS),
        }
    }

    /// Override the TTL applied to domain configs
    pub fn with_domain_ttl(mut self, ttl: Duration) -> Self {
        self.domain_ttl = ttl;
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    /// Get a raw value, remote tier first
    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(remote) = &self.remote {
            match remote.get(key).await {
                Ok(Some(value)) => {
                    counter!("bigbased_cache_operations_total", "operation" => "get", "tier" => "remote", "result" => "hit").increment(1);
                    return Some(value);
                }
                Ok(None) => {
                    counter!("bigbased_cache_operations_total", "operation" => "get", "tier" => "remote", "result" => "miss").increment(1);
                }
                Err(e) => {
                    counter!("bigbased_cache_operations_total", "operation" => "get", "tier" => "remote", "result" => "error").increment(1);
                    warn!(key = %key, error = %e, "Remote cache read failed, falling back to memory");
                }
            }
        }

        let value = self.memory.get(key);
        let result = if value.is_some() { "hit" } else { "miss" };
        counter!("bigbased_cache_operations_total", "operation" => "get", "tier" => "memory", "result" => result).increment(1);
        value
    }

    /// Write a raw value to both tiers; the memory write always happens
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) {
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.set(key, value, ttl).await {
                counter!("bigbased_cache_operations_total", "operation" => "set", "tier" => "remote", "result" => "error").increment(1);
                warn!(key = %key, error = %e, "Remote cache write failed");
            }
        }
        self.memory.set(key, value.to_string(), ttl);
    }

    pub async fn delete(&self, key: &str) {
        if let Some(remote) = &self.remote {
            if let Err(e) = remote.delete(key).await {
                counter!("bigbased_cache_operations_total", "operation" => "delete", "tier" => "remote", "result" => "error").increment(1);
                warn!(key = %key, error = %e, "Remote cache delete failed");
            }
        }
        self.memory.delete(key);
    }

    /// Drop expired memory entries now
    pub fn sweep(&self) -> usize {
        let removed = self.memory.sweep_expired();
        if removed > 0 {
            debug!(removed, "Swept expired cache entries");
        }
        gauge!("bigbased_cache_memory_entries").set(self.memory.len() as f64);
        removed
    }

    /// Sweep the memory tier on a fixed interval until the task is aborted
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        })
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("remote", &self.remote)
            .field("memory", &self.memory)
            .field("domain_ttl", &self.domain_ttl)
            .finish()
    }
}

#[async_trait]
impl CacheOperations for CacheManager {
    async fn get_domain_config(&self, domain: &str) -> Result<Option<DomainConfig>> {
        let key = domain_config_key(domain);
        let Some(raw) = self.get(&key).await else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding unreadable cached domain config");
                Ok(None)
            }
        }
    }

    async fn set_domain_config(&self, config: &DomainConfig) -> Result<()> {
        let key = domain_config_key(&config.domain);
        let serialized = serde_json::to_string(config)?;
        self.set(&key, &serialized, self.domain_ttl).await;
        Ok(())
    }

    async fn invalidate_domain_config(&self, domain: &str) -> Result<()> {
        self.delete(&domain_config_key(domain)).await;
        Ok(())
    }
}

/// Cache that stores nothing; every read is a miss
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCacheManager;

impl NoOpCacheManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheOperations for NoOpCacheManager {
    async fn get_domain_config(&self, _domain: &str) -> Result<Option<DomainConfig>> {
        Ok(None)
    }

    async fn set_domain_config(&self, _config: &DomainConfig) -> Result<()> {
        Ok(())
    }

    async fn invalidate_domain_config(&self, _domain: &str) -> Result<()> {
        Ok(())
    }
}
