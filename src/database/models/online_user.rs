use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One live hub connection. A user with several tabs open has several rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OnlineUser {
    pub connection_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
    pub is_online: bool,
    pub disconnected_at: Option<DateTime<Utc>>,
}
