use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{Menu, MenuType};
use crate::database::repositories::menu::{self, MenuFields};
use crate::error::ApiError;
use crate::rbac::{build_menu_tree, filter_user_menus, would_create_cycle, MenuNode};
use crate::services::permission_service::PermissionService;
use crate::services::validation::{normalize_optional, validate_code, validate_required, FieldErrors};

#[derive(Debug, Clone, Deserialize)]
pub struct MenuRequest {
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub path: Option<String>,
    pub component: Option<String>,
    pub icon: Option<String>,
    pub sort_order: Option<i32>,
    pub menu_type: String,
    pub permission_code: Option<String>,
    pub hidden: Option<bool>,
    pub enabled: Option<bool>,
}

impl MenuRequest {
    /// Normalizes the request and returns the parsed menu type
    pub fn validate(&mut self) -> Result<MenuType, ApiError> {
        self.name = self.name.trim().to_string();
        self.path = normalize_optional(self.path.take());
        self.component = normalize_optional(self.component.take());
        self.icon = normalize_optional(self.icon.take());
        self.permission_code = normalize_optional(self.permission_code.take());

        let mut errors = FieldErrors::new();
        errors.check("name", validate_required(&self.name, "Name", 50));

        let menu_type = match self.menu_type.parse::<MenuType>() {
            Ok(menu_type) => Some(menu_type),
            Err(e) => {
                errors.add("menu_type", e.to_string());
                None
            }
        };
        if menu_type == Some(MenuType::Menu) && self.path.is_none() {
            errors.add("path", "Path is required for menu entries");
        }
        if let Some(path) = &self.path {
            errors.check("path", validate_required(path, "Path", 200));
        }
        if let Some(code) = &self.permission_code {
            errors.check("permission_code", validate_code(code));
        }

        errors.into_result()?;
        // menu_type is Some whenever no field error was recorded
        menu_type.ok_or_else(|| ApiError::invalid_field("menu_type", "Menu type is required"))
    }
}

pub struct MenuService {
    pool: PgPool,
}

impl MenuService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Flat list ordered by (sort_order, name)
    pub async fn list(&self) -> Result<Vec<Menu>, ApiError> {
        Ok(menu::list(&self.pool).await?)
    }

    /// Full tree including disabled and button entries, for the admin editor
    pub async fn tree(&self) -> Result<Vec<MenuNode>, ApiError> {
        Ok(build_menu_tree(menu::list(&self.pool).await?))
    }

    pub async fn get(&self, id: Uuid) -> Result<Menu, ApiError> {
        Ok(menu::get(&self.pool, id).await?)
    }

    pub async fn create(&self, req: &MenuRequest, menu_type: MenuType) -> Result<Menu, ApiError> {
        if let Some(parent_id) = req.parent_id {
            self.check_parent(parent_id).await?;
        }
        let created = menu::insert(&self.pool, fields(req, menu_type)).await?;
        tracing::info!(menu_id = %created.id, name = %created.name, "Menu created");
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, req: &MenuRequest, menu_type: MenuType) -> Result<Menu, ApiError> {
        let all = menu::list(&self.pool).await?;
        if !all.iter().any(|m| m.id == id) {
            return Err(ApiError::not_found("Menu not found"));
        }

        if let Some(parent_id) = req.parent_id {
            if parent_id == id {
                return Err(ApiError::invalid_field("parent_id", "A menu cannot be its own parent"));
            }
            self.check_parent(parent_id).await?;
            if would_create_cycle(&all, id, Some(parent_id)) {
                return Err(ApiError::invalid_field(
                    "parent_id",
                    "A menu cannot be moved under one of its descendants",
                ));
            }
        }
        if menu_type == MenuType::Button && all.iter().any(|m| m.parent_id == Some(id)) {
            return Err(ApiError::invalid_field("menu_type", "A menu with children cannot become a button"));
        }

        Ok(menu::update(&self.pool, id, fields(req, menu_type)).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        menu::get(&self.pool, id).await?;
        if menu::has_children(&self.pool, id).await? {
            return Err(ApiError::conflict("Menu has child entries; delete or move them first"));
        }
        menu::delete(&self.pool, id).await?;
        tracing::info!(menu_id = %id, "Menu deleted");
        Ok(())
    }

    /// Navigation visible to one user given their effective permissions
    pub async fn user_menus(&self, user_id: Uuid) -> Result<Vec<MenuNode>, ApiError> {
        let permissions = PermissionService::with_pool(self.pool.clone())
            .permission_set_for_user(user_id)
            .await?;
        let menus = menu::list(&self.pool).await?;
        Ok(filter_user_menus(menus, &permissions))
    }

    async fn check_parent(&self, parent_id: Uuid) -> Result<(), ApiError> {
        let Some(parent) = menu::find_by_id(&self.pool, parent_id).await? else {
            return Err(ApiError::invalid_field("parent_id", "Parent menu does not exist"));
        };
        if parent.menu_type == MenuType::Button {
            return Err(ApiError::invalid_field("parent_id", "A button cannot have children"));
        }
        Ok(())
    }
}

fn fields(req: &MenuRequest, menu_type: MenuType) -> MenuFields<'_> {
    MenuFields {
        parent_id: req.parent_id,
        name: &req.name,
        path: req.path.as_deref(),
        component: req.component.as_deref(),
        icon: req.icon.as_deref(),
        sort_order: req.sort_order.unwrap_or(0),
        menu_type,
        permission_code: req.permission_code.as_deref(),
        hidden: req.hidden.unwrap_or(false),
        enabled: req.enabled.unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(menu_type: &str, path: Option<&str>) -> MenuRequest {
        MenuRequest {
            parent_id: None,
            name: " Users ".into(),
            path: path.map(str::to_string),
            component: Some("".into()),
            icon: None,
            sort_order: None,
            menu_type: menu_type.into(),
            permission_code: Some("user:view".into()),
            hidden: None,
            enabled: None,
        }
    }

    #[test]
    fn parses_menu_type_and_normalizes() {
        let mut req = request("Menu", Some("/system/users"));
        assert_eq!(req.validate().unwrap(), MenuType::Menu);
        assert_eq!(req.name, "Users");
        assert!(req.component.is_none());
    }

    #[test]
    fn unknown_menu_type_is_a_field_error() {
        let mut req = request("link", Some("/x"));
        let body = req.validate().unwrap_err().to_json();
        assert_eq!(body["code"], 400);
        assert!(body["data"]["field_errors"]["menu_type"].is_string());
    }

    #[test]
    fn menu_entries_need_a_path_but_buttons_do_not() {
        let mut menu_without_path = request("menu", None);
        let body = menu_without_path.validate().unwrap_err().to_json();
        assert!(body["data"]["field_errors"]["path"].is_string());

        let mut button = request("button", None);
        assert_eq!(button.validate().unwrap(), MenuType::Button);
    }

    #[test]
    fn defaults_fill_optional_flags() {
        let req = request("directory", None);
        let f = fields(&req, MenuType::Directory);
        assert_eq!(f.sort_order, 0);
        assert!(!f.hidden);
        assert!(f.enabled);
    }
}
