use crate::database::models::Permission;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, PathId, QueryParams};
use crate::services::permission_service::{PermissionFilter, PermissionRequest};
use crate::services::PermissionService;

/// GET /api/permissions?keyword=
pub async fn list(QueryParams(filter): QueryParams<PermissionFilter>) -> ApiResult<Vec<Permission>> {
    Ok(ApiResponse::success(PermissionService::new().await?.list(&filter).await?))
}

pub async fn create(JsonBody(mut payload): JsonBody<PermissionRequest>) -> ApiResult<Permission> {
    payload.validate()?;
    Ok(ApiResponse::created(PermissionService::new().await?.create(&payload).await?))
}

pub async fn get(PathId(id): PathId) -> ApiResult<Permission> {
    Ok(ApiResponse::success(PermissionService::new().await?.get(id).await?))
}

pub async fn update(PathId(id): PathId, JsonBody(mut payload): JsonBody<PermissionRequest>) -> ApiResult<Permission> {
    payload.validate()?;
    Ok(ApiResponse::success(
        PermissionService::new().await?.update(id, &payload).await?,
    ))
}

pub async fn delete(PathId(id): PathId) -> ApiResult<()> {
    PermissionService::new().await?.delete(id).await?;
    Ok(ApiResponse::empty("Permission deleted"))
}
