// Idempotent bootstrap data: permission catalogue, built-in roles, the first
// administrator and a default navigation menu. Safe to run on every start.

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::config::{self, AppConfig};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::MenuType;
use crate::database::repositories::{
    menu::{self, MenuFields},
    permission::{self, PermissionFields},
    role::{self, RoleFields},
    user::{self, NewUser},
};
use crate::rbac::codes;

#[derive(Debug, Default)]
pub struct SeedReport {
    pub permissions_added: usize,
    pub roles_added: usize,
    pub admin_created: bool,
    pub menus_created: usize,
}

pub async fn run() -> anyhow::Result<SeedReport> {
    let pool = DatabaseManager::pool().await?;
    seed(&pool, config::config()).await
}

pub async fn seed(pool: &PgPool, config: &AppConfig) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    for (code, name) in codes::CATALOGUE {
        let added = permission::insert_if_missing(
            pool,
            PermissionFields {
                name,
                code,
                description: None,
                enabled: true,
            },
        )
        .await?;
        if added {
            report.permissions_added += 1;
        }
    }

    let super_admin = ensure_role(
        pool,
        "Super Administrator",
        &config.security.super_admin_role_code,
        "Full access to every administration feature",
        &mut report,
    )
    .await?;
    ensure_role(
        pool,
        "User",
        &config.security.default_role_code,
        "Default role for self-registered accounts",
        &mut report,
    )
    .await?;

    let all_codes: Vec<String> = codes::CATALOGUE.iter().map(|(code, _)| code.to_string()).collect();
    let all_ids = permission::ids_for_codes(pool, &all_codes).await?;
    role::add_permissions(pool, super_admin, &all_ids).await?;

    report.admin_created = ensure_admin(pool, config, super_admin).await?;

    if menu::count(pool).await? == 0 {
        report.menus_created = seed_menus(pool).await?;
    }

    info!(
        permissions_added = report.permissions_added,
        roles_added = report.roles_added,
        admin_created = report.admin_created,
        menus_created = report.menus_created,
        "Seed complete"
    );
    Ok(report)
}

async fn ensure_role(
    pool: &PgPool,
    name: &str,
    code: &str,
    description: &str,
    report: &mut SeedReport,
) -> Result<Uuid, DatabaseError> {
    if let Some(existing) = role::find_by_code(pool, code).await? {
        return Ok(existing.id);
    }
    let created = role::insert(
        pool,
        RoleFields {
            name,
            code,
            description: Some(description),
            enabled: true,
        },
    )
    .await?;
    report.roles_added += 1;
    Ok(created.id)
}

async fn ensure_admin(pool: &PgPool, config: &AppConfig, super_admin: Uuid) -> anyhow::Result<bool> {
    let username = config.seed.admin_username.as_str();
    if user::username_exists(pool, username).await? {
        return Ok(false);
    }
    if config.seed.admin_password.is_empty() {
        warn!("SEED_ADMIN_PASSWORD is empty; skipping creation of admin user '{}'", username);
        return Ok(false);
    }

    let password_hash = hash_password(&config.seed.admin_password)?;
    let mut tx = pool.begin().await?;
    let admin = user::insert(
        &mut *tx,
        NewUser {
            username,
            password_hash: &password_hash,
            email: None,
            nickname: Some("Administrator"),
            enabled: true,
        },
    )
    .await?;
    user::add_roles(&mut *tx, admin.id, &[super_admin]).await?;
    tx.commit().await?;

    info!("Created admin user '{}'", username);
    Ok(true)
}

struct MenuSeed {
    name: &'static str,
    path: Option<&'static str>,
    component: Option<&'static str>,
    icon: Option<&'static str>,
    menu_type: MenuType,
    permission_code: Option<&'static str>,
    children: &'static [MenuSeed],
}

const DEFAULT_MENUS: &[MenuSeed] = &[
    MenuSeed {
        name: "Dashboard",
        path: Some("/dashboard"),
        component: Some("dashboard/index"),
        icon: Some("DashboardOutlined"),
        menu_type: MenuType::Menu,
        permission_code: None,
        children: &[],
    },
    MenuSeed {
        name: "System",
        path: Some("/system"),
        component: None,
        icon: Some("SettingOutlined"),
        menu_type: MenuType::Directory,
        permission_code: None,
        children: &[
            MenuSeed {
                name: "Users",
                path: Some("/system/users"),
                component: Some("system/user/index"),
                icon: Some("UserOutlined"),
                menu_type: MenuType::Menu,
                permission_code: Some(codes::USER_VIEW),
                children: &[
                    MenuSeed {
                        name: "Create user",
                        path: None,
                        component: None,
                        icon: None,
                        menu_type: MenuType::Button,
                        permission_code: Some(codes::USER_CREATE),
                        children: &[],
                    },
                    MenuSeed {
                        name: "Delete user",
                        path: None,
                        component: None,
                        icon: None,
                        menu_type: MenuType::Button,
                        permission_code: Some(codes::USER_DELETE),
                        children: &[],
                    },
                ],
            },
            MenuSeed {
                name: "Roles",
                path: Some("/system/roles"),
                component: Some("system/role/index"),
                icon: Some("TeamOutlined"),
                menu_type: MenuType::Menu,
                permission_code: Some(codes::ROLE_VIEW),
                children: &[],
            },
            MenuSeed {
                name: "Permissions",
                path: Some("/system/permissions"),
                component: Some("system/permission/index"),
                icon: Some("SafetyOutlined"),
                menu_type: MenuType::Menu,
                permission_code: Some(codes::PERMISSION_VIEW),
                children: &[],
            },
            MenuSeed {
                name: "Menus",
                path: Some("/system/menus"),
                component: Some("system/menu/index"),
                icon: Some("MenuOutlined"),
                menu_type: MenuType::Menu,
                permission_code: Some(codes::MENU_VIEW),
                children: &[],
            },
        ],
    },
    MenuSeed {
        name: "Monitor",
        path: Some("/monitor"),
        component: None,
        icon: Some("MonitorOutlined"),
        menu_type: MenuType::Directory,
        permission_code: None,
        children: &[MenuSeed {
            name: "Online users",
            path: Some("/monitor/online"),
            component: Some("monitor/online/index"),
            icon: Some("WifiOutlined"),
            menu_type: MenuType::Menu,
            permission_code: Some(codes::ONLINE_VIEW),
            children: &[],
        }],
    },
];

async fn seed_menus(pool: &PgPool) -> Result<usize, DatabaseError> {
    let mut created = 0;
    // (parent, level) work list; iterative so async recursion is not needed
    let mut pending: Vec<(Option<Uuid>, &'static [MenuSeed])> = vec![(None, DEFAULT_MENUS)];

    while let Some((parent_id, level)) = pending.pop() {
        for (index, seed) in level.iter().enumerate() {
            let row = menu::insert(
                pool,
                MenuFields {
                    parent_id,
                    name: seed.name,
                    path: seed.path,
                    component: seed.component,
                    icon: seed.icon,
                    sort_order: (index as i32 + 1) * 10,
                    menu_type: seed.menu_type,
                    permission_code: seed.permission_code,
                    hidden: false,
                    enabled: true,
                },
            )
            .await?;
            created += 1;
            if !seed.children.is_empty() {
                pending.push((Some(row.id), seed.children));
            }
        }
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn walk<'a>(level: &'a [MenuSeed], out: &mut Vec<&'a MenuSeed>) {
        for seed in level {
            out.push(seed);
            walk(seed.children, out);
        }
    }

    #[test]
    fn default_menus_only_reference_catalogue_codes() {
        let catalogue: HashSet<&str> = codes::CATALOGUE.iter().map(|(code, _)| *code).collect();
        let mut all = Vec::new();
        walk(DEFAULT_MENUS, &mut all);

        for seed in all {
            if let Some(code) = seed.permission_code {
                assert!(catalogue.contains(code), "menu '{}' uses unknown code {}", seed.name, code);
            }
        }
    }

    #[test]
    fn buttons_are_leaves_and_directories_have_children() {
        let mut all = Vec::new();
        walk(DEFAULT_MENUS, &mut all);
        for seed in all {
            match seed.menu_type {
                MenuType::Button => assert!(seed.children.is_empty()),
                MenuType::Directory => assert!(!seed.children.is_empty()),
                MenuType::Menu => {}
            }
        }
    }
}
