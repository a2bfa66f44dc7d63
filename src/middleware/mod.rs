pub mod auth;
pub mod extract;
pub mod permission;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use extract::{JsonBody, PathId, QueryParams};
pub use permission::require_permission;
pub use response::{ApiResponse, ApiResult};
