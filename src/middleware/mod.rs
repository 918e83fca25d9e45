pub mod auth;
pub mod response;
pub mod tenant;

pub use auth::{jwt_auth_middleware, require_root, AuthUser};
pub use response::{ApiResponse, ApiResult};
pub use tenant::{optional_tenant, require_tenant, TenantContext};
