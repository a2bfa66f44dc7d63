// rbac - pure permission and menu logic, no I/O
//
// Everything here works on rows already loaded by the repositories so it can
// be unit tested without a database.

pub mod codes;
pub mod menu_tree;
pub mod permissions;

pub use menu_tree::{build_menu_tree, filter_user_menus, would_create_cycle, MenuNode};
pub use permissions::{effective_permissions, PermissionSet};
