pub mod tenant_service;

pub use tenant_service::{TenantContext, TenantError, TenantProvisioner, TenantResolver};
