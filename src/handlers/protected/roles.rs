use crate::database::models::{Permission, Role};
use crate::middleware::{ApiResponse, ApiResult, JsonBody, PathId, QueryParams};
use crate::services::role_service::{AssignPermissionsRequest, RoleDetail, RoleRequest};
use crate::services::RoleService;
use crate::types::{PageQuery, Paged};

/// GET /api/roles?page=&page_size=&keyword=
pub async fn list(QueryParams(query): QueryParams<PageQuery>) -> ApiResult<Paged<Role>> {
    Ok(ApiResponse::success(RoleService::new().await?.list(&query).await?))
}

/// GET /api/roles/all - enabled roles, unpaged
pub async fn list_enabled() -> ApiResult<Vec<Role>> {
    Ok(ApiResponse::success(RoleService::new().await?.list_enabled().await?))
}

pub async fn create(JsonBody(mut payload): JsonBody<RoleRequest>) -> ApiResult<Role> {
    payload.validate()?;
    Ok(ApiResponse::created(RoleService::new().await?.create(&payload).await?))
}

pub async fn get(PathId(id): PathId) -> ApiResult<RoleDetail> {
    Ok(ApiResponse::success(RoleService::new().await?.get(id).await?))
}

pub async fn update(PathId(id): PathId, JsonBody(mut payload): JsonBody<RoleRequest>) -> ApiResult<Role> {
    payload.validate()?;
    Ok(ApiResponse::success(RoleService::new().await?.update(id, &payload).await?))
}

pub async fn delete(PathId(id): PathId) -> ApiResult<()> {
    RoleService::new().await?.delete(id).await?;
    Ok(ApiResponse::empty("Role deleted"))
}

pub async fn permissions(PathId(id): PathId) -> ApiResult<Vec<Permission>> {
    Ok(ApiResponse::success(RoleService::new().await?.permissions(id).await?))
}

/// PUT /api/roles/:id/permissions - replaces the full permission set
pub async fn set_permissions(
    PathId(id): PathId,
    JsonBody(payload): JsonBody<AssignPermissionsRequest>,
) -> ApiResult<Vec<Permission>> {
    let permissions = RoleService::new()
        .await?
        .set_permissions(id, &payload.permission_ids)
        .await?;
    Ok(ApiResponse::success(permissions))
}
