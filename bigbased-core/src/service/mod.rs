//! Business logic layer

pub mod analytics;
pub mod tenant;

pub use analytics::{VisitEvent, VisitTracker};
pub use tenant::TenantResolver;
