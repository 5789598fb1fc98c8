//! Tenant navigation and route visibility
//!
//! Allow-by-default: a path is denied only when it sits under a prefix that
//! belongs exclusively to another site variant.

use crate::domain::{DomainConfig, SiteType};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub href: &'static str,
    pub label: &'static str,
}

const fn link(href: &'static str, label: &'static str) -> NavLink {
    NavLink { href, label }
}

/// Links every tenant shows
const BASE_LINKS: &[NavLink] = &[
    link("/", "Home"),
    link("/about", "About"),
    link("/contact", "Contact"),
];

const BIGBASED_LINKS: &[NavLink] = &[
    link("/features", "Features"),
    link("/pricing", "Pricing"),
    link("/community", "Community"),
];

const BASEDBOOK_LINKS: &[NavLink] = &[
    link("/library", "Library"),
    link("/authors", "Authors"),
    link("/reading-lists", "Reading Lists"),
];

/// Variant-specific links; their hrefs double as the variant's exclusive routes
fn variant_links(site_type: SiteType) -> &'static [NavLink] {
    match site_type {
        SiteType::Bigbased => BIGBASED_LINKS,
        SiteType::Basedbook => BASEDBOOK_LINKS,
        SiteType::Custom => &[],
    }
}

const BRANDED_VARIANTS: &[SiteType] = &[SiteType::Bigbased, SiteType::Basedbook];

/// Base links followed by the tenant variant's extension list
pub fn tenant_navigation(config: &DomainConfig) -> Vec<NavLink> {
    BASE_LINKS
        .iter()
        .chain(variant_links(config.site_type))
        .cloned()
        .collect()
}

/// `prefix` covers `path` itself and anything below it
fn is_under(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Percent-decode a request path, replacing invalid UTF-8
pub fn decode_path(path: &str) -> String {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(path.as_bytes())).into_owned(),
    }
}

/// Canonical form used for ownership checks.
///
/// Decodes percent escapes, drops the query, fragment and `;` segment
/// parameters, collapses empty segments, resolves `.`/`..` and lowercases.
fn normalize_path(pathname: &str) -> String {
    let raw = pathname.split(['?', '#']).next().unwrap_or("");
    let decoded = decode_path(raw).to_lowercase();

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        let segment = segment.split(';').next().unwrap_or("");
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Variant that owns `pathname` exclusively, if any
pub fn route_owner(pathname: &str) -> Option<SiteType> {
    let path = normalize_path(pathname);
    BRANDED_VARIANTS.iter().copied().find(|variant| {
        variant_links(*variant)
            .iter()
            .any(|l| is_under(&path, l.href))
    })
}

pub fn is_route_allowed(config: &DomainConfig, pathname: &str) -> bool {
    match route_owner(pathname) {
        Some(owner) => owner == config.site_type,
        None => true,
    }
}

/// Presentation defaults merged with tenant-supplied branding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteBranding {
    pub site_name: String,
    pub primary_color: String,
    pub logo_url: Option<String>,
}

fn default_color(site_type: SiteType) -> &'static str {
    match site_type {
        SiteType::Bigbased => "#dc2626",
        SiteType::Basedbook => "#2563eb",
        SiteType::Custom => "#111827",
    }
}

pub fn site_branding(config: &DomainConfig) -> SiteBranding {
    SiteBranding {
        site_name: config
            .branding_str("siteName")
            .unwrap_or(config.site_type.display_name())
            .to_string(),
        primary_color: config
            .branding_str("primaryColor")
            .unwrap_or(default_color(config.site_type))
            .to_string(),
        logo_url: config.branding_str("logoUrl").map(str::to_string),
    }
}
