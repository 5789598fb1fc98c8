//! Pure policy functions over a resolved tenant

pub mod navigation;

pub use navigation::{
    decode_path, is_route_allowed, route_owner, site_branding, tenant_navigation, NavLink,
    SiteBranding,
};
