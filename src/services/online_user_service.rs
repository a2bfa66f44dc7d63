use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::OnlineUser;
use crate::database::repositories::online_user;
use crate::error::ApiError;
use crate::presence::PresenceHub;

const KICK_REASON: &str = "You have been signed out by an administrator";

#[derive(Debug, Clone, Serialize)]
pub struct OnlineCount {
    pub connections: i64,
    pub users: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct KickResult {
    pub connection_id: Uuid,
    /// Whether a live socket on this server received the force-logout notice
    pub delivered: bool,
}

pub struct OnlineUserService {
    pool: PgPool,
}

impl OnlineUserService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self::with_pool(DatabaseManager::pool().await?))
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<OnlineUser>, ApiError> {
        Ok(online_user::list_online(&self.pool).await?)
    }

    pub async fn count(&self) -> Result<OnlineCount, ApiError> {
        let (connections, users) = online_user::count_online(&self.pool).await?;
        Ok(OnlineCount { connections, users })
    }

    /// Force a connection offline. The socket (if held here) gets
    /// `force_logout` and is closed; the row is marked offline either way.
    pub async fn kick(&self, connection_id: Uuid, hub: &PresenceHub) -> Result<KickResult, ApiError> {
        let row = online_user::find(&self.pool, connection_id).await?;
        let delivered = hub.kick(connection_id, KICK_REASON);

        let known = row.as_ref().is_some_and(|r| r.is_online);
        if !known && !delivered {
            return Err(ApiError::not_found("Connection is not online"));
        }

        online_user::mark_offline(&self.pool, connection_id, Utc::now()).await?;
        tracing::info!(
            %connection_id,
            username = row.as_ref().map(|r| r.username.as_str()).unwrap_or("-"),
            delivered,
            "Connection kicked"
        );
        Ok(KickResult {
            connection_id,
            delivered,
        })
    }
}
