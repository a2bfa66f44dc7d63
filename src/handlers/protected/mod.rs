// Protected handlers (JWT authentication required)
//
// session       the caller's own account: profile, menus, password, logout
// users, roles, permissions, menus, online_users
//               administration endpoints, each route guarded by a permission code

pub mod menus;
pub mod online_users;
pub mod permissions;
pub mod roles;
pub mod session;
pub mod users;
