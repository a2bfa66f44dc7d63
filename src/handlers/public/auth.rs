// Token acquisition. Request bodies are validated before a database
// connection is taken so malformed input gets a 400 even when the database
// is down.

use axum::{extract::ConnectInfo, http::HeaderMap};
use std::net::SocketAddr;

use crate::database::models::User;
use crate::middleware::auth::client_ip;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::auth_service::{
    ensure_registration_open, LoginRequest, RefreshRequest, RegisterRequest, TokenResponse,
};
use crate::services::AuthService;

/// POST /api/auth/register - create an account with the default role
pub async fn register(JsonBody(mut payload): JsonBody<RegisterRequest>) -> ApiResult<User> {
    ensure_registration_open()?;
    payload.validate()?;

    let user = AuthService::new().await?.register(&payload).await?;
    Ok(ApiResponse::created(user).with_message("Registered"))
}

/// POST /api/auth/login - exchange credentials for an access/refresh pair
pub async fn login(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    JsonBody(mut payload): JsonBody<LoginRequest>,
) -> ApiResult<TokenResponse> {
    payload.validate()?;

    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let tokens = AuthService::new().await?.login(&payload, ip.as_deref()).await?;
    Ok(ApiResponse::success(tokens))
}

/// POST /api/auth/refresh - rotate a refresh token
pub async fn refresh(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> ApiResult<TokenResponse> {
    payload.validate()?;

    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let tokens = AuthService::new().await?.refresh(&payload, ip.as_deref()).await?;
    Ok(ApiResponse::success(tokens))
}
