use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Frames pushed to hub clients, encoded as `{"type": ..., "data": ...}`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { connection_id: Uuid },
    Pong { timestamp: i64 },
    OnlineUsers { users: Vec<OnlineConnection> },
    UserOnline { user_id: Uuid, username: String },
    UserOffline { user_id: Uuid, username: String },
    ForceLogout { reason: String },
    Error { message: String },
}

impl ServerMessage {
    pub fn to_text(&self) -> String {
        // Every variant holds plain data, so this only fails on allocator errors
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("Failed to encode hub message: {}", e);
            r#"{"type":"error","data":{"message":"encoding failure"}}"#.to_string()
        })
    }
}

/// Frames accepted from hub clients
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Heartbeat,
    GetOnlineUsers,
}

/// One live connection as seen by this process
#[derive(Debug, Clone, Serialize)]
pub struct OnlineConnection {
    pub connection_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub connected_at: DateTime<Utc>,
}
