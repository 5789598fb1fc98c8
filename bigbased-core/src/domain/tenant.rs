//! Tenant domain model

use super::hostname::site_type_from_domain;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Site personality a tenant runs as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SiteType {
    #[default]
    Bigbased,
    Basedbook,
    Custom,
}

impl SiteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::Bigbased => "bigbased",
            SiteType::Basedbook => "basedbook",
            SiteType::Custom => "custom",
        }
    }

    /// Brand name used when a tenant supplies none
    pub fn display_name(&self) -> &'static str {
        match self {
            SiteType::Bigbased => "Big Based",
            SiteType::Basedbook => "Basedbook",
            SiteType::Custom => "Custom Site",
        }
    }
}

impl std::str::FromStr for SiteType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bigbased" => Ok(SiteType::Bigbased),
            "basedbook" => Ok(SiteType::Basedbook),
            "custom" => Ok(SiteType::Custom),
            _ => Err(format!("Unknown site type: {}", s)),
        }
    }
}

impl std::fmt::Display for SiteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved configuration of a tenant, keyed by its canonical domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainConfig {
    /// Surrogate key; `0` marks a synthesized config that was never persisted
    pub id: i64,
    pub domain: String,
    pub site_type: SiteType,
    pub is_active: bool,
    #[serde(default)]
    pub custom_branding: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub owner_user_id: Option<String>,
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

impl DomainConfig {
    /// Hardcoded default served whenever nothing better is available
    pub fn fallback(domain: &str) -> Self {
        Self {
            id: 0,
            domain: domain.to_string(),
            site_type: site_type_from_domain(domain),
            is_active: true,
            custom_branding: serde_json::Map::new(),
            owner_user_id: None,
            settings: HashMap::new(),
        }
    }

    pub fn is_default(&self) -> bool {
        self.id == 0
    }

    /// Whether a setting switches an optional feature on
    pub fn has_feature(&self, key: &str) -> bool {
        self.settings
            .get(key)
            .map(|v| {
                matches!(
                    v.trim().to_lowercase().as_str(),
                    "true" | "1" | "on" | "enabled"
                )
            })
            .unwrap_or(false)
    }

    /// String value from the tenant's branding bag
    pub fn branding_str(&self, key: &str) -> Option<&str> {
        self.custom_branding
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self::fallback(super::hostname::DEFAULT_DOMAIN)
    }
}
