use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::{Permission, Role};
use crate::database::repositories::{
    permission,
    role::{self, RoleFields},
};
use crate::error::ApiError;
use crate::services::validation::{
    dedup_ids, ensure_ids_exist, normalize_optional, validate_code, validate_required, FieldErrors,
};
use crate::types::{PageQuery, Paged};

#[derive(Debug, Clone, Deserialize)]
pub struct RoleRequest {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

impl RoleRequest {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.name = self.name.trim().to_string();
        self.code = self.code.trim().to_string();
        self.description = normalize_optional(self.description.take());

        let mut errors = FieldErrors::new();
        errors
            .check("name", validate_required(&self.name, "Name", 50))
            .check("code", validate_code(&self.code));
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignPermissionsRequest {
    pub permission_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

pub struct RoleService {
    pool: PgPool,
}

impl RoleService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &PageQuery) -> Result<Paged<Role>, ApiError> {
        let (roles, total) = role::list(&self.pool, query).await?;
        Ok(Paged::new(roles, total, query))
    }

    /// Enabled roles for assignment pickers
    pub async fn list_enabled(&self) -> Result<Vec<Role>, ApiError> {
        Ok(role::list_enabled(&self.pool).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<RoleDetail, ApiError> {
        let role = role::get(&self.pool, id).await?;
        let permissions = role::permissions_of(&self.pool, id).await?;
        Ok(RoleDetail { role, permissions })
    }

    pub async fn create(&self, req: &RoleRequest) -> Result<Role, ApiError> {
        self.ensure_unique(req, None).await?;
        let created = role::insert(&self.pool, fields(req)).await?;
        tracing::info!(code = %created.code, "Role created");
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, req: &RoleRequest) -> Result<Role, ApiError> {
        let existing = role::get(&self.pool, id).await?;
        if is_super_admin_role(&existing) {
            guard_super_admin_update(&existing, req)?;
        }
        self.ensure_unique(req, Some(id)).await?;
        Ok(role::update(&self.pool, id, fields(req)).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let existing = role::get(&self.pool, id).await?;
        if is_super_admin_role(&existing) {
            return Err(ApiError::bad_request("The super administrator role cannot be deleted"));
        }
        role::delete(&self.pool, id).await?;
        tracing::info!(code = %existing.code, "Role deleted");
        Ok(())
    }

    pub async fn permissions(&self, id: Uuid) -> Result<Vec<Permission>, ApiError> {
        role::get(&self.pool, id).await?;
        Ok(role::permissions_of(&self.pool, id).await?)
    }

    /// Replace the role's permission set with exactly `permission_ids`
    pub async fn set_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> Result<Vec<Permission>, ApiError> {
        role::get(&self.pool, id).await?;

        let ids = dedup_ids(permission_ids);
        let existing = permission::existing_ids(&self.pool, &ids).await?;
        ensure_ids_exist("permission_ids", "permission ids", &ids, &existing)?;

        role::replace_permissions(&self.pool, id, &ids).await?;
        tracing::info!(role_id = %id, count = ids.len(), "Role permissions replaced");
        Ok(role::permissions_of(&self.pool, id).await?)
    }

    async fn ensure_unique(&self, req: &RoleRequest, except: Option<Uuid>) -> Result<(), ApiError> {
        match role::name_or_code_taken(&self.pool, &req.name, &req.code, except).await? {
            Some("name") => Err(ApiError::conflict("Role name already exists")),
            Some(_) => Err(ApiError::conflict("Role code already exists")),
            None => Ok(()),
        }
    }
}

fn is_super_admin_role(role: &Role) -> bool {
    role.code == config::config().security.super_admin_role_code
}

/// The super administrator role keeps its code and stays enabled
fn guard_super_admin_update(existing: &Role, req: &RoleRequest) -> Result<(), ApiError> {
    if existing.code != req.code {
        return Err(ApiError::bad_request("The super administrator role code cannot be changed"));
    }
    if req.enabled == Some(false) {
        return Err(ApiError::bad_request("The super administrator role cannot be disabled"));
    }
    Ok(())
}

fn fields(req: &RoleRequest) -> RoleFields<'_> {
    RoleFields {
        name: &req.name,
        code: &req.code,
        description: req.description.as_deref(),
        enabled: req.enabled.unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_request_reports_every_bad_field() {
        let mut req = RoleRequest {
            name: "   ".into(),
            code: "Not Valid".into(),
            description: None,
            enabled: None,
        };
        let body = req.validate().unwrap_err().to_json();
        assert_eq!(body["code"], 400);
        assert!(body["data"]["field_errors"]["name"].is_string());
        assert!(body["data"]["field_errors"]["code"].is_string());
    }

    fn role(code: &str) -> Role {
        let now = chrono::Utc::now();
        Role {
            id: Uuid::nil(),
            name: "Editors".into(),
            code: code.into(),
            description: None,
            enabled: true,
            created_at: now,
            modified_at: now,
        }
    }

    fn request(code: &str, enabled: Option<bool>) -> RoleRequest {
        RoleRequest {
            name: "Super Administrator".into(),
            code: code.into(),
            description: None,
            enabled,
        }
    }

    #[test]
    fn super_admin_role_cannot_be_disabled_or_recoded() {
        let existing = role("super_admin");

        let err = guard_super_admin_update(&existing, &request("super_admin", Some(false))).unwrap_err();
        assert_eq!(err.to_json()["message"], "The super administrator role cannot be disabled");

        let err = guard_super_admin_update(&existing, &request("root", None)).unwrap_err();
        assert_eq!(err.status_code(), 400);

        assert!(guard_super_admin_update(&existing, &request("super_admin", Some(true))).is_ok());
        assert!(guard_super_admin_update(&existing, &request("super_admin", None)).is_ok());
    }

    #[test]
    fn detail_flattens_role_fields() {
        let detail = RoleDetail {
            role: role("editor"),
            permissions: vec![],
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["code"], "editor");
        assert!(json["permissions"].as_array().unwrap().is_empty());
    }
}
