//! Tenant API handlers
//!
//! Every handler here reads the tenant already attached by
//! `tenant_context_middleware`, except cache invalidation which targets an
//! explicit domain.

use crate::domain::{DomainConfig, SiteType};
use crate::error::{AppError, Result};
use crate::middleware::TenantContext;
use crate::policy::{is_route_allowed, site_branding, tenant_navigation, NavLink, SiteBranding};
use crate::state::HasTenancy;
use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResponse {
    pub site_type: SiteType,
    pub links: Vec<NavLink>,
    pub branding: SiteBranding,
}

impl NavigationResponse {
    fn for_tenant(config: &DomainConfig) -> Self {
        Self {
            site_type: config.site_type,
            links: tenant_navigation(config),
            branding: site_branding(config),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RouteCheckQuery {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteCheckResponse {
    pub path: String,
    pub allowed: bool,
}

/// Minimal page payload for non-API paths the tenant is allowed to see
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub path: String,
    pub domain: String,
    pub navigation: NavigationResponse,
}

/// Resolved tenant for the request host
pub async fn current(Extension(tenant): Extension<TenantContext>) -> Json<DomainConfig> {
    Json(tenant.0.as_ref().clone())
}

/// Navigation links and branding for the request host
pub async fn navigation(Extension(tenant): Extension<TenantContext>) -> Json<NavigationResponse> {
    Json(NavigationResponse::for_tenant(&tenant))
}

/// Whether the request host's tenant may see `?path=`
pub async fn check_route(
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<RouteCheckQuery>,
) -> Result<Json<RouteCheckResponse>> {
    let path = query
        .path
        .filter(|p| p.starts_with('/'))
        .ok_or_else(|| AppError::BadRequest("path must start with '/'".to_string()))?;

    let allowed = is_route_allowed(&tenant, &path);
    Ok(Json(RouteCheckResponse { path, allowed }))
}

/// Drop the cached config of a domain so the next request reloads it
pub async fn invalidate_cache<S: HasTenancy>(
    State(state): State<S>,
    Path(domain): Path<String>,
) -> impl IntoResponse {
    let canonical = state.tenant_resolver().invalidate(&domain).await;
    info!(domain = %canonical, "Domain config cache invalidated");
    StatusCode::NO_CONTENT
}

/// Fallback for everything the router does not name. Pages reaching this
/// handler already passed the route guard.
pub async fn page_context(
    method: Method,
    uri: Uri,
    Extension(tenant): Extension<TenantContext>,
) -> Result<Json<PageContext>> {
    let path = uri.path().to_string();
    if method != Method::GET || path.starts_with("/api/") {
        return Err(AppError::NotFound(format!("No route for {}", path)));
    }

    Ok(Json(PageContext {
        path,
        domain: tenant.domain.clone(),
        navigation: NavigationResponse::for_tenant(&tenant),
    }))
}
