//! Data access layer (Repository pattern)

pub mod profile;
pub mod tenant;

pub use profile::{ProfileRepository, ProfileRepositoryImpl};
pub use tenant::{TenantRepository, TenantRepositoryImpl};
