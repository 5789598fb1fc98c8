//! Configuration management for Big Based Core

use crate::domain::DEFAULT_DOMAIN;
use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Remote key-value store configuration
    pub kv: KvConfig,
    /// Tenant resolution configuration
    pub tenancy: TenancyConfig,
    /// Visit analytics configuration
    pub analytics: AnalyticsConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
    /// Bearer token for admin endpoints; admin endpoints reject every
    /// request when unset
    pub admin_api_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Remote KV REST store. Both `url` and `token` must be present for the
/// remote tier to be used at all.
#[derive(Debug, Clone, Default)]
pub struct KvConfig {
    pub rest_api_url: Option<String>,
    pub rest_api_token: Option<String>,
    pub timeout_secs: u64,
}

impl KvConfig {
    /// Returns `(url, token)` when the remote tier is fully configured
    pub fn remote(&self) -> Option<(&str, &str)> {
        match (&self.rest_api_url, &self.rest_api_token) {
            (Some(url), Some(token)) if !url.is_empty() && !token.is_empty() => {
                Some((url.as_str(), token.as_str()))
            }
            _ => None,
        }
    }
}

/// Options recognised by the tenant resolver
#[derive(Debug, Clone)]
pub struct TenancyConfig {
    /// When false, every hostname resolves to the hardcoded default config
    pub enhanced_domains_enabled: bool,
    /// Domain returned for empty or malformed hostnames
    pub default_domain: String,
    /// TTL for cached domain configs
    pub cache_ttl_secs: u64,
    /// Interval of the in-memory cache sweep
    pub sweep_interval_secs: u64,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            enhanced_domains_enabled: false,
            default_domain: DEFAULT_DOMAIN.to_string(),
            cache_ttl_secs: 300,
            sweep_interval_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfig {
    /// Endpoint accepting `{domainId, type: "visit"}`. Tracking is off when unset.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "json" or "pretty"
    pub log_format: String,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
        }
    }
}

/// Interpret a flag value the way the deployment scripts set them.
fn is_truthy(value: Option<String>) -> bool {
    value
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Enhanced domains are on only when explicitly enabled; the disable flag always wins.
fn enhanced_domains_enabled<F>(lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let enabled =
        is_truthy(lookup("ENHANCED_DOMAINS")) || is_truthy(lookup("NEXT_PUBLIC_ENHANCED_DOMAINS"));
    let disabled = is_truthy(lookup("DISABLE_ENHANCED_DOMAINS"))
        || is_truthy(lookup("NEXT_PUBLIC_DISABLE_ENHANCED_DOMAINS"));
    enabled && !disabled
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            http_host: lookup("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: lookup("HTTP_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: lookup("DATABASE_MIN_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            kv: KvConfig {
                rest_api_url: non_empty(lookup("KV_REST_API_URL"))
                    .map(|url| url.trim_end_matches('/').to_string()),
                rest_api_token: non_empty(lookup("KV_REST_API_TOKEN")),
                timeout_secs: lookup("KV_REST_API_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            tenancy: TenancyConfig {
                enhanced_domains_enabled: enhanced_domains_enabled(&lookup),
                default_domain: non_empty(lookup("DEFAULT_DOMAIN"))
                    .map(|d| d.to_lowercase())
                    .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
                cache_ttl_secs: lookup("TENANT_CACHE_TTL_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
                sweep_interval_secs: lookup("CACHE_SWEEP_INTERVAL_SECS")
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(300),
            },
            analytics: AnalyticsConfig {
                endpoint: non_empty(lookup("ANALYTICS_ENDPOINT")),
            },
            telemetry: TelemetryConfig {
                log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
                metrics_enabled: is_truthy(lookup("METRICS_ENABLED")),
            },
            admin_api_token: non_empty(lookup("ADMIN_API_TOKEN")),
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
