use axum::extract::Extension;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::rbac::MenuNode;
use crate::services::auth_service::{ChangePasswordRequest, LogoutRequest, Profile};
use crate::services::AuthService;

/// GET /api/auth/me - caller profile with roles and effective permission codes
pub async fn me(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Profile> {
    let profile = AuthService::new().await?.profile(auth_user.user_id).await?;
    Ok(ApiResponse::success(profile))
}

/// GET /api/auth/menus - navigation tree filtered by the caller's permissions
pub async fn menus(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Vec<MenuNode>> {
    let tree = AuthService::new().await?.menus(auth_user.user_id).await?;
    Ok(ApiResponse::success(tree))
}

/// PUT /api/auth/password
pub async fn change_password(
    Extension(auth_user): Extension<AuthUser>,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> ApiResult<()> {
    payload.validate()?;
    AuthService::new()
        .await?
        .change_password(auth_user.user_id, &payload)
        .await?;
    Ok(ApiResponse::empty("Password changed; please sign in again"))
}

/// POST /api/auth/logout - body `{ "refresh_token": "..." }` is optional
pub async fn logout(
    Extension(auth_user): Extension<AuthUser>,
    payload: Option<JsonBody<LogoutRequest>>,
) -> ApiResult<Value> {
    let payload = payload.map(|JsonBody(p)| p).unwrap_or_default();
    let revoked = AuthService::new().await?.logout(auth_user.user_id, &payload).await?;
    Ok(ApiResponse::success(json!({ "revoked": revoked })).with_message("Logged out"))
}
