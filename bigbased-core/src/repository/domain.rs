//! Domain (tenant) repository

use crate::domain::{DomainConfig, SiteType};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, MySqlPool};
use std::collections::HashMap;
use tracing::warn;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// Active tenant for an exact canonical domain, settings flattened in
    async fn find_active_by_domain(&self, domain: &str) -> Result<Option<DomainConfig>>;
    /// Connectivity check for readiness
    async fn ping(&self) -> Result<()>;
}

/// One row of `domains` LEFT JOIN `domain_settings`
#[derive(Debug, Clone, FromRow)]
pub struct DomainSettingRow {
    pub id: i64,
    pub domain: String,
    pub site_type: String,
    pub is_active: bool,
    pub custom_branding: Option<Json<serde_json::Value>>,
    pub owner_user_id: Option<String>,
    pub setting_key: Option<String>,
    pub setting_value: Option<String>,
}

/// Fold joined rows into a single config. Rows must all belong to one domain.
pub fn fold_domain_rows(rows: Vec<DomainSettingRow>) -> Option<DomainConfig> {
    let mut rows = rows.into_iter();
    let first = rows.next()?;

    let site_type = first.site_type.parse().unwrap_or_else(|e: String| {
        warn!(domain = %first.domain, error = %e, "Treating unknown site type as custom");
        SiteType::Custom
    });

    let custom_branding = match first.custom_branding {
        Some(Json(serde_json::Value::Object(map))) => map,
        _ => serde_json::Map::new(),
    };

    let mut settings = HashMap::new();
    let mut collect = |key: Option<String>, value: Option<String>| {
        if let Some(key) = key {
            settings.insert(key, value.unwrap_or_default());
        }
    };
    collect(first.setting_key, first.setting_value);
    for row in rows {
        collect(row.setting_key, row.setting_value);
    }

    Some(DomainConfig {
        id: first.id,
        domain: first.domain,
        site_type,
        is_active: first.is_active,
        custom_branding,
        owner_user_id: first.owner_user_id,
        settings,
    })
}

#[derive(Clone)]
pub struct DomainRepositoryImpl {
    pool: MySqlPool,
}

impl DomainRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DomainRepository for DomainRepositoryImpl {
    async fn find_active_by_domain(&self, domain: &str) -> Result<Option<DomainConfig>> {
        let rows = sqlx::query_as::<_, DomainSettingRow>(
            r#"
            SELECT d.id, d.domain, d.site_type, d.is_active, d.custom_branding, d.owner_user_id,
                   s.setting_key, s.setting_value
            FROM domains d
            LEFT JOIN domain_settings s ON s.domain_id = d.id
            WHERE d.domain = ? AND d.is_active = TRUE
            ORDER BY s.setting_key
            "#,
        )
        .bind(domain)
        .fetch_all(&self.pool)
        .await?;

        Ok(fold_domain_rows(rows))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
