use axum::extract::Extension;

use crate::database::models::{Permission, Role, User};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, PathId, QueryParams};
use crate::services::permission_service::EffectivePermissions;
use crate::services::user_service::{
    AssignRolesRequest, AssignUserPermissionsRequest, CreateUserRequest, ResetPasswordRequest, SetStatusRequest,
    UpdateUserRequest, UserDetail,
};
use crate::services::UserService;
use crate::types::{PageQuery, Paged};

/// GET /api/users?page=&page_size=&keyword=
pub async fn list(QueryParams(query): QueryParams<PageQuery>) -> ApiResult<Paged<User>> {
    let page = UserService::new().await?.list(&query).await?;
    Ok(ApiResponse::success(page))
}

/// POST /api/users
pub async fn create(JsonBody(mut payload): JsonBody<CreateUserRequest>) -> ApiResult<UserDetail> {
    payload.validate()?;
    let created = UserService::new().await?.create(&payload).await?;
    Ok(ApiResponse::created(created))
}

/// GET /api/users/:id
pub async fn get(PathId(id): PathId) -> ApiResult<UserDetail> {
    Ok(ApiResponse::success(UserService::new().await?.get(id).await?))
}

/// PUT /api/users/:id
pub async fn update(PathId(id): PathId, JsonBody(mut payload): JsonBody<UpdateUserRequest>) -> ApiResult<User> {
    payload.validate()?;
    Ok(ApiResponse::success(UserService::new().await?.update(id, &payload).await?))
}

/// DELETE /api/users/:id
pub async fn delete(Extension(auth_user): Extension<AuthUser>, PathId(id): PathId) -> ApiResult<()> {
    UserService::new().await?.delete(auth_user.user_id, id).await?;
    Ok(ApiResponse::empty("User deleted"))
}

/// PUT /api/users/:id/status - body `{ "enabled": bool }`
pub async fn set_status(
    Extension(auth_user): Extension<AuthUser>,
    PathId(id): PathId,
    JsonBody(payload): JsonBody<SetStatusRequest>,
) -> ApiResult<User> {
    let user = UserService::new()
        .await?
        .set_enabled(auth_user.user_id, id, payload.enabled)
        .await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/users/:id/password - administrative reset
pub async fn reset_password(PathId(id): PathId, JsonBody(payload): JsonBody<ResetPasswordRequest>) -> ApiResult<()> {
    payload.validate()?;
    UserService::new().await?.reset_password(id, &payload).await?;
    Ok(ApiResponse::empty("Password reset"))
}

/// GET /api/users/:id/roles
pub async fn roles(PathId(id): PathId) -> ApiResult<Vec<Role>> {
    Ok(ApiResponse::success(UserService::new().await?.roles(id).await?))
}

/// PUT /api/users/:id/roles - replaces the full role set
pub async fn set_roles(PathId(id): PathId, JsonBody(payload): JsonBody<AssignRolesRequest>) -> ApiResult<Vec<Role>> {
    let roles = UserService::new().await?.set_roles(id, &payload.role_ids).await?;
    Ok(ApiResponse::success(roles))
}

/// GET /api/users/:id/permissions - direct grants only
pub async fn permissions(PathId(id): PathId) -> ApiResult<Vec<Permission>> {
    Ok(ApiResponse::success(UserService::new().await?.permissions(id).await?))
}

/// PUT /api/users/:id/permissions - replaces the direct grants
pub async fn set_permissions(
    PathId(id): PathId,
    JsonBody(payload): JsonBody<AssignUserPermissionsRequest>,
) -> ApiResult<Vec<Permission>> {
    let permissions = UserService::new()
        .await?
        .set_permissions(id, &payload.permission_ids)
        .await?;
    Ok(ApiResponse::success(permissions))
}

/// GET /api/users/:id/effective-permissions
pub async fn effective_permissions(PathId(id): PathId) -> ApiResult<EffectivePermissions> {
    Ok(ApiResponse::success(
        UserService::new().await?.effective_permissions(id).await?,
    ))
}
