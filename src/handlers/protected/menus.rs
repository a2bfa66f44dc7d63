use crate::database::models::Menu;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, PathId};
use crate::rbac::MenuNode;
use crate::services::menu_service::MenuRequest;
use crate::services::MenuService;

/// GET /api/menus - flat list
pub async fn list() -> ApiResult<Vec<Menu>> {
    Ok(ApiResponse::success(MenuService::new().await?.list().await?))
}

/// GET /api/menus/tree - every entry, nested
pub async fn tree() -> ApiResult<Vec<MenuNode>> {
    Ok(ApiResponse::success(MenuService::new().await?.tree().await?))
}

pub async fn create(JsonBody(mut payload): JsonBody<MenuRequest>) -> ApiResult<Menu> {
    let menu_type = payload.validate()?;
    Ok(ApiResponse::created(
        MenuService::new().await?.create(&payload, menu_type).await?,
    ))
}

pub async fn get(PathId(id): PathId) -> ApiResult<Menu> {
    Ok(ApiResponse::success(MenuService::new().await?.get(id).await?))
}

pub async fn update(PathId(id): PathId, JsonBody(mut payload): JsonBody<MenuRequest>) -> ApiResult<Menu> {
    let menu_type = payload.validate()?;
    Ok(ApiResponse::success(
        MenuService::new().await?.update(id, &payload, menu_type).await?,
    ))
}

pub async fn delete(PathId(id): PathId) -> ApiResult<()> {
    MenuService::new().await?.delete(id).await?;
    Ok(ApiResponse::empty("Menu deleted"))
}
