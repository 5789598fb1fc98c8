//! Big Based Core - tenant resolution service
//!
//! Maps the host of each request to a tenant configuration (site variant,
//! branding, settings) and decides which navigation and routes that tenant
//! exposes. Lookups go through a remote KV tier and an in-process TTL cache
//! before reaching MySQL, and degrade to a hardcoded default on any failure.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod policy;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
