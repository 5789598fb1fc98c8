//! Domain models for Big Based Core

pub mod hostname;
pub mod tenant;

pub use hostname::*;
pub use tenant::*;
