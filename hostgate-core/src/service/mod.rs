//! Business logic layer

pub mod tenant;

pub use tenant::TenantResolver;
