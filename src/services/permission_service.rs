use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::Permission;
use crate::database::repositories::{
    permission::{self, PermissionFields},
    user,
};
use crate::error::ApiError;
use crate::rbac::{effective_permissions, PermissionSet};
use crate::services::validation::{normalize_optional, validate_code, validate_required, FieldErrors};
use crate::types::escape_like;

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionRequest {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

impl PermissionRequest {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.name = self.name.trim().to_string();
        self.code = self.code.trim().to_string();
        self.description = normalize_optional(self.description.take());

        let mut errors = FieldErrors::new();
        errors
            .check("name", validate_required(&self.name, "Name", 100))
            .check("code", validate_code(&self.code));
        errors.into_result()
    }
}

/// `?keyword=` filter for the (unpaged) permission list
#[derive(Debug, Default, Deserialize)]
pub struct PermissionFilter {
    pub keyword: Option<String>,
}

/// Effective permissions of one user, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct EffectivePermissions {
    pub user_id: Uuid,
    pub is_super_admin: bool,
    pub permissions: Vec<Permission>,
}

pub struct PermissionService {
    pool: PgPool,
}

impl PermissionService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, filter: &PermissionFilter) -> Result<Vec<Permission>, ApiError> {
        let pattern = filter
            .keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| format!("%{}%", escape_like(k)));
        Ok(permission::list(&self.pool, pattern.as_deref()).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Permission, ApiError> {
        Ok(permission::get(&self.pool, id).await?)
    }

    pub async fn create(&self, req: &PermissionRequest) -> Result<Permission, ApiError> {
        if permission::code_taken(&self.pool, &req.code, None).await? {
            return Err(ApiError::conflict("Permission code already exists"));
        }
        let created = permission::insert(&self.pool, fields(req)).await?;
        tracing::info!(code = %created.code, "Permission created");
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, req: &PermissionRequest) -> Result<Permission, ApiError> {
        permission::get(&self.pool, id).await?;
        if permission::code_taken(&self.pool, &req.code, Some(id)).await? {
            return Err(ApiError::conflict("Permission code already exists"));
        }
        Ok(permission::update(&self.pool, id, fields(req)).await?)
    }

    /// Role and user grants cascade away with the permission
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        if !permission::delete(&self.pool, id).await? {
            return Err(ApiError::not_found("Permission not found"));
        }
        tracing::info!(permission_id = %id, "Permission deleted");
        Ok(())
    }

    /// Direct grants plus everything inherited through enabled roles, deduplicated
    pub async fn effective_for_user(&self, user_id: Uuid) -> Result<EffectivePermissions, ApiError> {
        user::get(&self.pool, user_id).await?;
        let (permissions, is_super_admin) = resolve(&self.pool, user_id).await?;
        Ok(EffectivePermissions {
            user_id,
            is_super_admin,
            permissions,
        })
    }

    pub async fn permission_set_for_user(&self, user_id: Uuid) -> Result<PermissionSet, ApiError> {
        let (permissions, is_super_admin) = resolve(&self.pool, user_id).await?;
        Ok(PermissionSet::from_permissions(&permissions, is_super_admin))
    }
}

async fn resolve(pool: &PgPool, user_id: Uuid) -> Result<(Vec<Permission>, bool), ApiError> {
    let super_admin_code = &config::config().security.super_admin_role_code;
    let roles = user::roles_of(pool, user_id).await?;
    let is_super_admin = roles.iter().any(|r| r.enabled && &r.code == super_admin_code);

    let direct = user::direct_permissions(pool, user_id).await?;
    let inherited = user::inherited_permissions(pool, user_id).await?;
    Ok((effective_permissions(direct, inherited), is_super_admin))
}

fn fields(req: &PermissionRequest) -> PermissionFields<'_> {
    PermissionFields {
        name: &req.name,
        code: &req.code,
        description: req.description.as_deref(),
        enabled: req.enabled.unwrap_or(true),
    }
}
