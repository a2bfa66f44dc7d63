// Connection lifecycle events. The hub publishes them on a bounded channel and
// a single writer task applies them to online_users, so socket handling never
// waits on the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::repositories::online_user::{self, NewConnection};

#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    Connected {
        connection_id: Uuid,
        user_id: Uuid,
        username: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
        at: DateTime<Utc>,
    },
    Heartbeat {
        connection_id: Uuid,
        at: DateTime<Utc>,
    },
    Disconnected {
        connection_id: Uuid,
        at: DateTime<Utc>,
    },
}

impl PresenceEvent {
    pub fn connection_id(&self) -> Uuid {
        match self {
            PresenceEvent::Connected { connection_id, .. }
            | PresenceEvent::Heartbeat { connection_id, .. }
            | PresenceEvent::Disconnected { connection_id, .. } => *connection_id,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            PresenceEvent::Connected { .. } => "connected",
            PresenceEvent::Heartbeat { .. } => "heartbeat",
            PresenceEvent::Disconnected { .. } => "disconnected",
        }
    }
}

/// Sending half handed to the hub
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<PresenceEvent>,
}

impl EventPublisher {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PresenceEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Heartbeats are dropped when the writer is behind; connect and
    /// disconnect events wait for room. Returns whether the event was queued.
    pub async fn publish(&self, event: PresenceEvent) -> bool {
        match event {
            PresenceEvent::Heartbeat { connection_id, .. } => match self.tx.try_send(event) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%connection_id, "Presence event queue full; heartbeat dropped");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::warn!(%connection_id, "Presence writer stopped; heartbeat dropped");
                    false
                }
            },
            other => {
                let connection_id = other.connection_id();
                let kind = other.kind();
                if self.tx.send(other).await.is_err() {
                    tracing::warn!(%connection_id, kind, "Presence writer stopped; event dropped");
                    return false;
                }
                true
            }
        }
    }
}

/// Where presence events end up
#[async_trait]
pub trait PresenceStore: Send + Sync + 'static {
    async fn apply(&self, event: &PresenceEvent) -> Result<(), DatabaseError>;
}

/// Writes events to the online_users table
#[derive(Debug, Default, Clone, Copy)]
pub struct PgPresenceStore;

#[async_trait]
impl PresenceStore for PgPresenceStore {
    async fn apply(&self, event: &PresenceEvent) -> Result<(), DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        match event {
            PresenceEvent::Connected {
                connection_id,
                user_id,
                username,
                ip_address,
                user_agent,
                at,
            } => {
                online_user::insert(
                    &pool,
                    NewConnection {
                        connection_id: *connection_id,
                        user_id: *user_id,
                        username,
                        ip_address: ip_address.as_deref(),
                        user_agent: user_agent.as_deref(),
                        at: *at,
                    },
                )
                .await
            }
            PresenceEvent::Heartbeat { connection_id, at } => {
                if !online_user::touch_heartbeat(&pool, *connection_id, *at).await? {
                    tracing::debug!(%connection_id, "Heartbeat for unknown or offline connection");
                }
                Ok(())
            }
            PresenceEvent::Disconnected { connection_id, at } => {
                online_user::mark_offline(&pool, *connection_id, *at).await?;
                Ok(())
            }
        }
    }
}

/// Drain events in order until every publisher is gone. Failures are logged
/// and the event is skipped.
pub async fn run_writer<S: PresenceStore>(mut rx: mpsc::Receiver<PresenceEvent>, store: S) {
    tracing::info!("Presence event writer started");
    while let Some(event) = rx.recv().await {
        if let Err(e) = store.apply(&event).await {
            tracing::error!(
                connection_id = %event.connection_id(),
                kind = event.kind(),
                "Failed to persist presence event: {}",
                e
            );
        }
    }
    tracing::info!("Presence event writer stopped");
}

pub fn spawn_writer<S: PresenceStore>(rx: mpsc::Receiver<PresenceEvent>, store: S) -> JoinHandle<()> {
    tokio::spawn(run_writer(rx, store))
}
