use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::database::manager::DatabaseManager;
use crate::database::models::{Permission, Role, User};
use crate::database::repositories::{
    permission, refresh_token, role,
    user::{self, NewUser},
};
use crate::error::ApiError;
use crate::services::permission_service::{EffectivePermissions, PermissionService};
use crate::services::validation::{
    dedup_ids, ensure_ids_exist, normalize_optional, validate_email, validate_password, validate_required,
    validate_username, FieldErrors,
};
use crate::types::{PageQuery, Paged};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub enabled: Option<bool>,
    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

impl CreateUserRequest {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.username = self.username.trim().to_string();
        self.email = normalize_optional(self.email.take());
        self.nickname = normalize_optional(self.nickname.take());

        let mut errors = FieldErrors::new();
        errors
            .check("username", validate_username(&self.username))
            .check("password", validate_password(&self.password));
        if let Some(email) = &self.email {
            errors.check("email", validate_email(email));
        }
        if let Some(nickname) = &self.nickname {
            errors.check("nickname", validate_required(nickname, "Nickname", 50));
        }
        errors.into_result()
    }
}

/// Omitted fields are left unchanged; an empty string clears the field
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub nickname: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.email = self.email.take().map(|v| v.trim().to_string());
        self.nickname = self.nickname.take().map(|v| v.trim().to_string());

        let mut errors = FieldErrors::new();
        if let Some(email) = self.email.as_deref().filter(|v| !v.is_empty()) {
            errors.check("email", validate_email(email));
        }
        if let Some(nickname) = self.nickname.as_deref().filter(|v| !v.is_empty()) {
            errors.check("nickname", validate_required(nickname, "Nickname", 50));
        }
        errors.into_result()
    }

    pub fn email_change(&self) -> Option<Option<&str>> {
        change(&self.email)
    }

    pub fn nickname_change(&self) -> Option<Option<&str>> {
        change(&self.nickname)
    }
}

fn change(value: &Option<String>) -> Option<Option<&str>> {
    value.as_deref().map(|v| (!v.is_empty()).then_some(v))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validate_password(&self.new_password).map_err(|reason| ApiError::invalid_field("new_password", reason))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignRolesRequest {
    pub role_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignUserPermissionsRequest {
    pub permission_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<Role>,
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, query: &PageQuery) -> Result<Paged<User>, ApiError> {
        let (users, total) = user::list(&self.pool, query).await?;
        Ok(Paged::new(users, total, query))
    }

    pub async fn get(&self, id: Uuid) -> Result<UserDetail, ApiError> {
        let user = user::get(&self.pool, id).await?;
        let roles = user::roles_of(&self.pool, id).await?;
        Ok(UserDetail { user, roles })
    }

    pub async fn create(&self, req: &CreateUserRequest) -> Result<UserDetail, ApiError> {
        if user::username_exists(&self.pool, &req.username).await? {
            return Err(ApiError::conflict("Username already exists"));
        }

        let role_ids = dedup_ids(&req.role_ids);
        let existing = role::existing_ids(&self.pool, &role_ids).await?;
        ensure_ids_exist("role_ids", "role ids", &role_ids, &existing)?;

        let password_hash = hash_password(&req.password)?;

        let mut tx = self.pool.begin().await?;
        let created = user::insert(
            &mut *tx,
            NewUser {
                username: &req.username,
                password_hash: &password_hash,
                email: req.email.as_deref(),
                nickname: req.nickname.as_deref(),
                enabled: req.enabled.unwrap_or(true),
            },
        )
        .await?;
        user::add_roles(&mut *tx, created.id, &role_ids).await?;
        tx.commit().await?;

        tracing::info!(user_id = %created.id, username = %created.username, "User created");
        self.get(created.id).await
    }

    pub async fn update(&self, id: Uuid, req: &UpdateUserRequest) -> Result<User, ApiError> {
        Ok(user::update_profile(&self.pool, id, req.email_change(), req.nickname_change()).await?)
    }

    pub async fn delete(&self, actor: Uuid, id: Uuid) -> Result<(), ApiError> {
        if actor == id {
            return Err(ApiError::bad_request("You cannot delete your own account"));
        }
        if !user::delete(&self.pool, id).await? {
            return Err(ApiError::not_found("User not found"));
        }
        tracing::info!(user_id = %id, deleted_by = %actor, "User deleted");
        Ok(())
    }

    /// Disabling also revokes the user's refresh tokens so no new access tokens can be minted
    pub async fn set_enabled(&self, actor: Uuid, id: Uuid, enabled: bool) -> Result<User, ApiError> {
        if actor == id && !enabled {
            return Err(ApiError::bad_request("You cannot disable your own account"));
        }
        let updated = user::set_enabled(&self.pool, id, enabled).await?;
        if !enabled {
            let revoked = refresh_token::revoke_all_for_user(&self.pool, id).await?;
            tracing::info!(user_id = %id, revoked, "User disabled");
        }
        Ok(updated)
    }

    pub async fn reset_password(&self, id: Uuid, req: &ResetPasswordRequest) -> Result<(), ApiError> {
        let password_hash = hash_password(&req.new_password)?;
        user::set_password_hash(&self.pool, id, &password_hash).await?;
        refresh_token::revoke_all_for_user(&self.pool, id).await?;
        tracing::info!(user_id = %id, "Password reset by administrator");
        Ok(())
    }

    pub async fn roles(&self, id: Uuid) -> Result<Vec<Role>, ApiError> {
        user::get(&self.pool, id).await?;
        Ok(user::roles_of(&self.pool, id).await?)
    }

    pub async fn set_roles(&self, id: Uuid, role_ids: &[Uuid]) -> Result<Vec<Role>, ApiError> {
        user::get(&self.pool, id).await?;

        let ids = dedup_ids(role_ids);
        let existing = role::existing_ids(&self.pool, &ids).await?;
        ensure_ids_exist("role_ids", "role ids", &ids, &existing)?;

        user::replace_roles(&self.pool, id, &ids).await?;
        tracing::info!(user_id = %id, count = ids.len(), "User roles replaced");
        Ok(user::roles_of(&self.pool, id).await?)
    }

    /// Direct grants only; see `effective_permissions` for the merged view
    pub async fn permissions(&self, id: Uuid) -> Result<Vec<Permission>, ApiError> {
        user::get(&self.pool, id).await?;
        Ok(user::direct_permissions(&self.pool, id).await?)
    }

    pub async fn set_permissions(&self, id: Uuid, permission_ids: &[Uuid]) -> Result<Vec<Permission>, ApiError> {
        user::get(&self.pool, id).await?;

        let ids = dedup_ids(permission_ids);
        let existing = permission::existing_ids(&self.pool, &ids).await?;
        ensure_ids_exist("permission_ids", "permission ids", &ids, &existing)?;

        user::replace_permissions(&self.pool, id, &ids).await?;
        tracing::info!(user_id = %id, count = ids.len(), "User permissions replaced");
        Ok(user::direct_permissions(&self.pool, id).await?)
    }

    pub async fn effective_permissions(&self, id: Uuid) -> Result<EffectivePermissions, ApiError> {
        PermissionService::with_pool(self.pool.clone()).effective_for_user(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request() -> CreateUserRequest {
        CreateUserRequest {
            username: "alice".into(),
            password: "secret1".into(),
            email: None,
            nickname: None,
            enabled: None,
            role_ids: vec![],
        }
    }

    #[test]
    fn create_request_blank_optionals_become_none() {
        let mut req = CreateUserRequest {
            email: Some("  ".into()),
            nickname: Some("".into()),
            ..create_request()
        };
        req.validate().unwrap();
        assert!(req.email.is_none());
        assert!(req.nickname.is_none());
    }

    #[test]
    fn create_request_rejects_bad_email() {
        let mut req = CreateUserRequest {
            email: Some("not-an-email".into()),
            ..create_request()
        };
        let body = req.validate().unwrap_err().to_json();
        assert_eq!(body["data"]["field_errors"]["email"], "Invalid email format");
    }

    #[test]
    fn role_ids_default_to_empty() {
        let req: CreateUserRequest =
            serde_json::from_value(serde_json::json!({"username": "bob", "password": "secret1"})).unwrap();
        assert!(req.role_ids.is_empty());
    }

    #[test]
    fn update_request_keeps_omitted_and_clears_blank_fields() {
        let mut req: UpdateUserRequest =
            serde_json::from_value(serde_json::json!({"nickname": "  "})).unwrap();
        req.validate().unwrap();
        assert_eq!(req.email_change(), None);
        assert_eq!(req.nickname_change(), Some(None));

        let mut req: UpdateUserRequest =
            serde_json::from_value(serde_json::json!({"email": " bob@example.com "})).unwrap();
        req.validate().unwrap();
        assert_eq!(req.email_change(), Some(Some("bob@example.com")));
        assert_eq!(req.nickname_change(), None);
    }

    #[test]
    fn update_request_rejects_bad_email() {
        let mut req = UpdateUserRequest {
            email: Some("nope".into()),
            nickname: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn reset_password_length_is_checked() {
        let req = ResetPasswordRequest { new_password: "123".into() };
        let body = req.validate().unwrap_err().to_json();
        assert!(body["data"]["field_errors"]["new_password"].is_string());
    }
}
