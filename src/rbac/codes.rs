// Built-in permission codes. Route guards and the seeder both read these.

pub const USER_VIEW: &str = "user:view";
pub const USER_CREATE: &str = "user:create";
pub const USER_UPDATE: &str = "user:update";
pub const USER_DELETE: &str = "user:delete";
pub const USER_ASSIGN_ROLE: &str = "user:assign-role";
pub const USER_ASSIGN_PERMISSION: &str = "user:assign-permission";

pub const ROLE_VIEW: &str = "role:view";
pub const ROLE_CREATE: &str = "role:create";
pub const ROLE_UPDATE: &str = "role:update";
pub const ROLE_DELETE: &str = "role:delete";
pub const ROLE_ASSIGN_PERMISSION: &str = "role:assign-permission";

pub const PERMISSION_VIEW: &str = "permission:view";
pub const PERMISSION_CREATE: &str = "permission:create";
pub const PERMISSION_UPDATE: &str = "permission:update";
pub const PERMISSION_DELETE: &str = "permission:delete";

pub const MENU_VIEW: &str = "menu:view";
pub const MENU_CREATE: &str = "menu:create";
pub const MENU_UPDATE: &str = "menu:update";
pub const MENU_DELETE: &str = "menu:delete";

pub const ONLINE_VIEW: &str = "online:view";
pub const ONLINE_KICK: &str = "online:kick";

/// (code, display name) for every built-in permission
pub const CATALOGUE: &[(&str, &str)] = &[
    (USER_VIEW, "View users"),
    (USER_CREATE, "Create users"),
    (USER_UPDATE, "Update users"),
    (USER_DELETE, "Delete users"),
    (USER_ASSIGN_ROLE, "Assign roles to users"),
    (USER_ASSIGN_PERMISSION, "Grant permissions to users"),
    (ROLE_VIEW, "View roles"),
    (ROLE_CREATE, "Create roles"),
    (ROLE_UPDATE, "Update roles"),
    (ROLE_DELETE, "Delete roles"),
    (ROLE_ASSIGN_PERMISSION, "Assign permissions to roles"),
    (PERMISSION_VIEW, "View permissions"),
    (PERMISSION_CREATE, "Create permissions"),
    (PERMISSION_UPDATE, "Update permissions"),
    (PERMISSION_DELETE, "Delete permissions"),
    (MENU_VIEW, "View menus"),
    (MENU_CREATE, "Create menus"),
    (MENU_UPDATE, "Update menus"),
    (MENU_DELETE, "Delete menus"),
    (ONLINE_VIEW, "View online users"),
    (ONLINE_KICK, "Force online users offline"),
];
