use axum::{
    extract::{Extension, Request, State},
    middleware::Next,
    response::Response,
};

use crate::database::manager::DatabaseManager;
use crate::database::repositories::user;
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::services::PermissionService;

/// Route guard: the caller must hold `code` (or be a super admin).
///
/// Permissions are resolved from the database on every request, so grants
/// and revocations apply without re-issuing tokens. Install with
/// `axum::middleware::from_fn_with_state(code, require_permission)` inside
/// the JWT layer.
pub async fn require_permission(
    State(code): State<&'static str>,
    Extension(auth_user): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let pool = DatabaseManager::pool().await?;

    match user::find_by_id(&pool, auth_user.user_id).await? {
        Some(account) if account.enabled => {}
        Some(_) => return Err(ApiError::unauthorized("Account is disabled")),
        None => return Err(ApiError::unauthorized("User no longer exists")),
    }

    let permissions = PermissionService::with_pool(pool)
        .permission_set_for_user(auth_user.user_id)
        .await?;

    if !permissions.has(code) {
        tracing::warn!(
            user_id = %auth_user.user_id,
            username = %auth_user.username,
            permission = code,
            "Permission denied"
        );
        return Err(ApiError::forbidden(format!("Missing permission: {}", code)));
    }

    Ok(next.run(request).await)
}
