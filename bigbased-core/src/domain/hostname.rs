//! Hostname canonicalisation and site-variant classification

use super::tenant::SiteType;

/// Domain served when a hostname is empty or malformed
pub const DEFAULT_DOMAIN: &str = "bigbased.com";

/// Longest hostname permitted by RFC 1035
const MAX_DOMAIN_LEN: usize = 253;

/// Brand tokens in classification priority order
const BRAND_TOKENS: &[(&str, SiteType)] = &[
    ("basedbook", SiteType::Basedbook),
    ("bigbased", SiteType::Bigbased),
];

lazy_static::lazy_static! {
    /// Dot-separated labels of 1-63 alphanumerics/hyphens, no leading or trailing hyphen
    pub static ref DOMAIN_REGEX: regex::Regex = regex::Regex::new(
        r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$"
    )
    .unwrap();
}

/// Structural check only: no DNS lookups and no I/O.
pub fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty() && domain.len() <= MAX_DOMAIN_LEN && DOMAIN_REGEX.is_match(domain)
}

/// Canonicalise a raw `Host` value, falling back to [`DEFAULT_DOMAIN`].
pub fn parse_domain(hostname: &str) -> String {
    parse_domain_or(hostname, DEFAULT_DOMAIN)
}

/// Canonicalise a raw `Host` value.
///
/// Strips the port, a trailing root dot and one leading `www.` label, then
/// lowercases. Anything that does not pass [`is_valid_domain`] yields
/// `fallback` (or [`DEFAULT_DOMAIN`] if `fallback` is itself invalid), so the
/// result is always a valid domain.
pub fn parse_domain_or(hostname: &str, fallback: &str) -> String {
    let fallback = if is_valid_domain(fallback) {
        fallback
    } else {
        DEFAULT_DOMAIN
    };

    let host = hostname.trim();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };

    let host = host.trim_end_matches('.').to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if is_valid_domain(host) {
        host.to_string()
    } else {
        fallback.to_string()
    }
}

/// Classify a canonical domain into its site variant.
///
/// A brand token matches when it equals one of the domain's labels, so
/// `app.basedbook.io` is Basedbook but `notbasedbook.com` is Custom. Tokens
/// are checked in priority order and the first hit wins.
pub fn site_type_from_domain(domain: &str) -> SiteType {
    let domain = domain.to_lowercase();
    BRAND_TOKENS
        .iter()
        .find(|(token, _)| domain.split('.').any(|label| label == *token))
        .map(|(_, site_type)| *site_type)
        .unwrap_or(SiteType::Custom)
}
