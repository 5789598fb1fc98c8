//! Data access layer (Repository pattern)

pub mod domain;

pub use domain::DomainRepository;

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;

/// Build the pool without connecting; tenant resolution degrades to the
/// default config while the database is unreachable.
pub fn connect_lazy(config: &DatabaseConfig) -> Result<MySqlPool> {
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&config.url)?;
    Ok(pool)
}
