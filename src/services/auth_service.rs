use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{generate_refresh_token, hash_refresh_token, issue_access_token};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::{Role, User};
use crate::database::repositories::{
    refresh_token, role,
    user::{self, NewUser},
};
use crate::error::ApiError;
use crate::rbac::MenuNode;
use crate::services::menu_service::MenuService;
use crate::services::permission_service::PermissionService;
use crate::services::validation::{
    normalize_optional, validate_email, validate_password, validate_required, validate_username, FieldErrors,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub nickname: Option<String>,
}

impl RegisterRequest {
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

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&mut self) -> Result<(), ApiError> {
        self.username = self.username.trim().to_string();

        let mut errors = FieldErrors::new();
        if self.username.is_empty() {
            errors.add("username", "Username is required");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl RefreshRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.refresh_token.trim().is_empty() {
            return Err(ApiError::invalid_field("refresh_token", "Refresh token is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let mut errors = FieldErrors::new();
        if self.old_password.is_empty() {
            errors.add("old_password", "Current password is required");
        }
        errors.check("new_password", validate_password(&self.new_password));
        errors.into_result()
    }
}

/// Access/refresh pair returned by login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<Role>,
    pub permissions: Vec<String>,
    pub is_super_admin: bool,
}

/// Fails with 403 when self-registration is switched off
pub fn ensure_registration_open() -> Result<(), ApiError> {
    if config::config().security.allow_registration {
        Ok(())
    } else {
        Err(ApiError::forbidden("Registration is disabled"))
    }
}

pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an enabled account carrying the default role (when that role exists)
    pub async fn register(&self, req: &RegisterRequest) -> Result<User, ApiError> {
        if user::username_exists(&self.pool, &req.username).await? {
            return Err(ApiError::conflict("Username already exists"));
        }

        let password_hash = hash_password(&req.password)?;
        let default_role = role::find_by_code(&self.pool, &config::config().security.default_role_code).await?;

        let mut tx = self.pool.begin().await?;
        let created = user::insert(
            &mut *tx,
            NewUser {
                username: &req.username,
                password_hash: &password_hash,
                email: req.email.as_deref(),
                nickname: req.nickname.as_deref(),
                enabled: true,
            },
        )
        .await?;
        match default_role {
            Some(role) => user::add_roles(&mut *tx, created.id, &[role.id]).await?,
            None => tracing::warn!(
                "Default role '{}' not found; '{}' registered without roles",
                config::config().security.default_role_code,
                created.username
            ),
        }
        tx.commit().await?;

        tracing::info!(user_id = %created.id, username = %created.username, "User registered");
        Ok(created)
    }

    pub async fn login(&self, req: &LoginRequest, client_ip: Option<&str>) -> Result<TokenResponse, ApiError> {
        let Some(account) = user::find_by_username(&self.pool, &req.username).await? else {
            tracing::info!(username = %req.username, "Login failed: unknown user");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        };
        if !verify_password(&req.password, &account.password_hash) {
            tracing::info!(username = %req.username, "Login failed: wrong password");
            return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
        }
        if !account.enabled {
            return Err(ApiError::forbidden("Account is disabled"));
        }

        let now = Utc::now();
        user::touch_last_login(&self.pool, account.id, now).await?;
        let account = User {
            last_login_at: Some(now),
            ..account
        };

        let (plain, expires_at) = {
            let plain = generate_refresh_token();
            let expires_at = refresh_expiry(now);
            refresh_token::insert(&self.pool, account.id, &hash_refresh_token(&plain), expires_at, client_ip).await?;
            (plain, expires_at)
        };

        tracing::info!(user_id = %account.id, username = %account.username, "User logged in");
        self.token_response(account, plain, expires_at).await
    }

    /// Rotate a refresh token. Presenting an already revoked token revokes
    /// every outstanding token of its owner.
    pub async fn refresh(&self, req: &RefreshRequest, client_ip: Option<&str>) -> Result<TokenResponse, ApiError> {
        let hash = hash_refresh_token(req.refresh_token.trim());
        let Some(current) = refresh_token::find_by_hash(&self.pool, &hash).await? else {
            return Err(ApiError::unauthorized("Invalid refresh token"));
        };

        if current.is_revoked() {
            let revoked = refresh_token::revoke_all_for_user(&self.pool, current.user_id).await?;
            tracing::warn!(
                user_id = %current.user_id,
                revoked,
                "Revoked refresh token presented again; all sessions of the user were revoked"
            );
            return Err(ApiError::unauthorized("Refresh token has been revoked"));
        }

        let now = Utc::now();
        if current.is_expired_at(now) {
            return Err(ApiError::unauthorized("Refresh token has expired"));
        }

        let account = match user::find_by_id(&self.pool, current.user_id).await? {
            Some(account) if account.enabled => account,
            _ => {
                refresh_token::revoke(&self.pool, current.id, None).await?;
                return Err(ApiError::unauthorized("Account is not available"));
            }
        };

        let plain = generate_refresh_token();
        let expires_at = refresh_expiry(now);

        let mut tx = self.pool.begin().await?;
        let next = refresh_token::insert(&mut *tx, account.id, &hash_refresh_token(&plain), expires_at, client_ip).await?;
        if !refresh_token::revoke(&mut *tx, current.id, Some(next.id)).await? {
            // Lost a race with a concurrent refresh of the same token
            tx.rollback().await?;
            return Err(ApiError::unauthorized("Refresh token has been revoked"));
        }
        tx.commit().await?;

        tracing::debug!(user_id = %account.id, "Refresh token rotated");
        self.token_response(account, plain, expires_at).await
    }

    /// Revoke the presented token if it belongs to the caller, otherwise every caller token
    pub async fn logout(&self, user_id: Uuid, req: &LogoutRequest) -> Result<u64, ApiError> {
        let presented = req
            .refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        if let Some(plain) = presented {
            if let Some(token) = refresh_token::find_by_hash(&self.pool, &hash_refresh_token(plain)).await? {
                if token.user_id == user_id {
                    let revoked = refresh_token::revoke(&self.pool, token.id, None).await?;
                    tracing::info!(user_id = %user_id, "User logged out");
                    return Ok(u64::from(revoked));
                }
            }
        }

        let revoked = refresh_token::revoke_all_for_user(&self.pool, user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "User logged out of all sessions");
        Ok(revoked)
    }

    pub async fn change_password(&self, user_id: Uuid, req: &ChangePasswordRequest) -> Result<(), ApiError> {
        let account = user::get(&self.pool, user_id).await?;
        if !verify_password(&req.old_password, &account.password_hash) {
            return Err(ApiError::invalid_field("old_password", "Current password is incorrect"));
        }

        let password_hash = hash_password(&req.new_password)?;
        user::set_password_hash(&self.pool, user_id, &password_hash).await?;
        let revoked = refresh_token::revoke_all_for_user(&self.pool, user_id).await?;
        tracing::info!(user_id = %user_id, revoked, "Password changed");
        Ok(())
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<Profile, ApiError> {
        let account = user::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
        let roles = user::roles_of(&self.pool, user_id).await?;
        let permissions = PermissionService::with_pool(self.pool.clone())
            .permission_set_for_user(user_id)
            .await?;

        Ok(Profile {
            user: account,
            roles,
            permissions: permissions.codes(),
            is_super_admin: permissions.is_super_admin(),
        })
    }

    pub async fn menus(&self, user_id: Uuid) -> Result<Vec<MenuNode>, ApiError> {
        MenuService::with_pool(self.pool.clone()).user_menus(user_id).await
    }

    async fn token_response(
        &self,
        account: User,
        refresh_token: String,
        refresh_expires_at: DateTime<Utc>,
    ) -> Result<TokenResponse, ApiError> {
        let roles: Vec<String> = user::roles_of(&self.pool, account.id)
            .await?
            .into_iter()
            .filter(|r| r.enabled)
            .map(|r| r.code)
            .collect();
        let access = issue_access_token(account.id, &account.username, roles)?;

        Ok(TokenResponse {
            access_token: access.token,
            refresh_token,
            token_type: "Bearer",
            expires_in: access.expires_in,
            refresh_expires_at,
            user: account,
        })
    }
}

fn refresh_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(config::config().security.refresh_token_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_validation_collects_field_errors() {
        let mut req = RegisterRequest {
            username: "a".into(),
            password: "123".into(),
            email: Some("nope".into()),
            nickname: None,
        };
        let body = req.validate().unwrap_err().to_json();
        let fields = &body["data"]["field_errors"];
        assert!(fields["username"].is_string());
        assert!(fields["password"].is_string());
        assert!(fields["email"].is_string());
    }

    #[test]
    fn login_requires_both_fields() {
        let mut req = LoginRequest {
            username: "  ".into(),
            password: String::new(),
        };
        let err = req.validate().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Validation failed");
    }

    #[test]
    fn blank_refresh_token_is_rejected() {
        let req = RefreshRequest { refresh_token: " ".into() };
        assert_eq!(req.validate().unwrap_err().status_code(), 400);
    }

    #[test]
    fn change_password_checks_new_password_policy() {
        let req = ChangePasswordRequest {
            old_password: "old-secret".into(),
            new_password: "short".into(),
        };
        let body = req.validate().unwrap_err().to_json();
        assert!(body["data"]["field_errors"]["new_password"].is_string());
    }

    #[test]
    fn refresh_expiry_uses_configured_days() {
        let now = Utc::now();
        let days = config::config().security.refresh_token_days;
        assert_eq!(refresh_expiry(now) - now, Duration::days(days));
    }
}
