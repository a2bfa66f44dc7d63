use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET / - service metadata and route overview
pub async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": "RBAC Admin API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "User, role, permission and menu administration with online presence",
        "endpoints": {
            "health": "/health (public)",
            "public_auth": "/api/auth/register, /api/auth/login, /api/auth/refresh (public)",
            "session": "/api/auth/me, /api/auth/menus, /api/auth/password, /api/auth/logout (authenticated)",
            "users": "/api/users[/:id] (user:*)",
            "roles": "/api/roles[/:id] (role:*)",
            "permissions": "/api/permissions[/:id] (permission:*)",
            "menus": "/api/menus[/:id], /api/menus/tree (menu:*)",
            "online_users": "/api/online-users (online:*)",
            "hub": "/hubs/chat?access_token=<jwt> (WebSocket)"
        }
    })))
}

/// GET /health - 200 when the database answers, 503 otherwise
pub async fn health() -> Response {
    let now = Utc::now();

    match DatabaseManager::health_check().await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok"
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "code": 503,
                    "message": "Database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
                .into_response()
        }
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
