use axum::extract::State;

use crate::database::models::OnlineUser;
use crate::middleware::{ApiResponse, ApiResult, PathId};
use crate::server::AppState;
use crate::services::online_user_service::{KickResult, OnlineCount};
use crate::services::OnlineUserService;

/// GET /api/online-users
pub async fn list() -> ApiResult<Vec<OnlineUser>> {
    Ok(ApiResponse::success(OnlineUserService::new().await?.list().await?))
}

/// GET /api/online-users/count
pub async fn count() -> ApiResult<OnlineCount> {
    Ok(ApiResponse::success(OnlineUserService::new().await?.count().await?))
}

/// DELETE /api/online-users/:connection_id - force logout
pub async fn kick(State(state): State<AppState>, PathId(connection_id): PathId) -> ApiResult<KickResult> {
    let result = OnlineUserService::new()
        .await?
        .kick(connection_id, &state.hub)
        .await?;
    Ok(ApiResponse::success(result).with_message("Connection closed"))
}
