// Business operations behind the HTTP handlers: validate, call repositories,
// shape the result. Each service owns a pool handle.

pub mod auth_service;
pub mod menu_service;
pub mod online_user_service;
pub mod permission_service;
pub mod role_service;
pub mod user_service;
pub mod validation;

pub use auth_service::AuthService;
pub use menu_service::MenuService;
pub use online_user_service::OnlineUserService;
pub use permission_service::PermissionService;
pub use role_service::RoleService;
pub use user_service::UserService;
