use axum::extract::ws::{CloseFrame, Message};
use chrono::Utc;
use dashmap::DashMap;
use std::borrow::Cow;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{EventPublisher, PresenceEvent};
use super::messages::{OnlineConnection, ServerMessage};

/// Close code sent with a forced logout (policy violation)
const CLOSE_KICKED: u16 = 1008;

struct ConnectionHandle {
    info: OnlineConnection,
    sender: mpsc::UnboundedSender<Message>,
}

/// Connecting client as authenticated at upgrade time
#[derive(Debug, Clone)]
pub struct HubClient {
    pub user_id: Uuid,
    pub username: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// In-process registry of live hub sockets.
///
/// Holds one outbound queue per connection so other parts of the server
/// (broadcasts, administrative kicks) can reach a socket. Persistence goes
/// through the event publisher only.
pub struct PresenceHub {
    connections: DashMap<Uuid, ConnectionHandle>,
    events: EventPublisher,
}

impl PresenceHub {
    pub fn new(events: EventPublisher) -> Self {
        Self {
            connections: DashMap::new(),
            events,
        }
    }

    /// Register a socket and announce it. Returns the connection id and the
    /// queue the socket task should forward to the client.
    pub async fn register(&self, client: HubClient) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
        let connection_id = Uuid::new_v4();
        let connected_at = Utc::now();
        let (tx, rx) = mpsc::unbounded_channel();

        self.connections.insert(
            connection_id,
            ConnectionHandle {
                info: OnlineConnection {
                    connection_id,
                    user_id: client.user_id,
                    username: client.username.clone(),
                    connected_at,
                },
                sender: tx,
            },
        );

        self.events
            .publish(PresenceEvent::Connected {
                connection_id,
                user_id: client.user_id,
                username: client.username.clone(),
                ip_address: client.ip_address,
                user_agent: client.user_agent,
                at: connected_at,
            })
            .await;

        self.send_to(connection_id, &ServerMessage::Connected { connection_id });
        self.broadcast(&ServerMessage::UserOnline {
            user_id: client.user_id,
            username: client.username.clone(),
        });

        tracing::info!(%connection_id, user_id = %client.user_id, username = %client.username, "Hub client connected");
        (connection_id, rx)
    }

    /// Record liveness and build the reply
    pub async fn heartbeat(&self, connection_id: Uuid) -> ServerMessage {
        let now = Utc::now();
        self.events
            .publish(PresenceEvent::Heartbeat { connection_id, at: now })
            .await;
        ServerMessage::Pong {
            timestamp: now.timestamp_millis(),
        }
    }

    /// Remove a socket; no-op if it is already gone
    pub async fn unregister(&self, connection_id: Uuid) {
        let Some((_, handle)) = self.connections.remove(&connection_id) else {
            return;
        };

        self.events
            .publish(PresenceEvent::Disconnected {
                connection_id,
                at: Utc::now(),
            })
            .await;
        self.broadcast(&ServerMessage::UserOffline {
            user_id: handle.info.user_id,
            username: handle.info.username.clone(),
        });

        tracing::info!(%connection_id, username = %handle.info.username, "Hub client disconnected");
    }

    /// Deliver `force_logout` and close the socket. False when the connection
    /// is not held by this process.
    pub fn kick(&self, connection_id: Uuid, reason: &str) -> bool {
        let Some(handle) = self.connections.get(&connection_id) else {
            return false;
        };

        let notice = ServerMessage::ForceLogout {
            reason: reason.to_string(),
        };
        let _ = handle.sender.send(Message::Text(notice.to_text()));
        let _ = handle.sender.send(Message::Close(Some(CloseFrame {
            code: CLOSE_KICKED,
            reason: Cow::Owned(reason.to_string()),
        })));

        tracing::info!(%connection_id, username = %handle.info.username, "Hub client kicked");
        true
    }

    pub fn send_to(&self, connection_id: Uuid, message: &ServerMessage) -> bool {
        match self.connections.get(&connection_id) {
            Some(handle) => handle.sender.send(Message::Text(message.to_text())).is_ok(),
            None => false,
        }
    }

    /// Send to every socket. A closed queue is skipped; its socket task
    /// still owns the `unregister` that records the disconnect.
    pub fn broadcast(&self, message: &ServerMessage) {
        let text = message.to_text();
        for entry in self.connections.iter() {
            if entry.sender.send(Message::Text(text.clone())).is_err() {
                tracing::debug!(connection_id = %entry.key(), "Skipping closed hub queue");
            }
        }
    }

    /// Live connections, newest first
    pub fn online(&self) -> Vec<OnlineConnection> {
        let mut list: Vec<OnlineConnection> = self.connections.iter().map(|e| e.info.clone()).collect();
        list.sort_by(|a, b| b.connected_at.cmp(&a.connected_at));
        list
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_connected(&self, connection_id: Uuid) -> bool {
        self.connections.contains_key(&connection_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn hub() -> (PresenceHub, mpsc::Receiver<PresenceEvent>) {
        let (publisher, rx) = EventPublisher::channel(32);
        (PresenceHub::new(publisher), rx)
    }

    fn client(name: &str) -> HubClient {
        HubClient {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            ip_address: Some("127.0.0.1".into()),
            user_agent: None,
        }
    }

    fn frame_type(message: Message) -> String {
        match message {
            Message::Text(text) => {
                let value: Value = serde_json::from_str(&text).unwrap();
                value["type"].as_str().unwrap().to_string()
            }
            Message::Close(_) => "close".to_string(),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[tokio::test]
    async fn register_greets_client_and_publishes_connect() {
        let (hub, mut events) = hub();
        let (id, mut outbound) = hub.register(client("alice")).await;

        assert_eq!(frame_type(outbound.recv().await.unwrap()), "connected");
        assert_eq!(frame_type(outbound.recv().await.unwrap()), "user_online");
        assert!(hub.is_connected(id));

        match events.recv().await.unwrap() {
            PresenceEvent::Connected { connection_id, username, .. } => {
                assert_eq!(connection_id, id);
                assert_eq!(username, "alice");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn others_hear_about_arrivals_and_departures() {
        let (hub, _events) = hub();
        let (_, mut alice_out) = hub.register(client("alice")).await;
        let (bob, _bob_out) = hub.register(client("bob")).await;

        // alice: connected, user_online(alice), user_online(bob)
        alice_out.recv().await.unwrap();
        alice_out.recv().await.unwrap();
        assert_eq!(frame_type(alice_out.recv().await.unwrap()), "user_online");

        hub.unregister(bob).await;
        assert_eq!(frame_type(alice_out.recv().await.unwrap()), "user_offline");
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn heartbeat_replies_with_pong_and_publishes() {
        let (hub, mut events) = hub();
        let (id, _out) = hub.register(client("alice")).await;
        events.recv().await.unwrap();

        match hub.heartbeat(id).await {
            ServerMessage::Pong { timestamp } => assert!(timestamp > 0),
            other => panic!("unexpected reply {:?}", other),
        }
        assert!(matches!(
            events.recv().await.unwrap(),
            PresenceEvent::Heartbeat { connection_id, .. } if connection_id == id
        ));
    }

    #[tokio::test]
    async fn kick_sends_force_logout_then_close() {
        let (hub, _events) = hub();
        let (id, mut out) = hub.register(client("alice")).await;
        out.recv().await.unwrap();
        out.recv().await.unwrap();

        assert!(hub.kick(id, "Kicked by administrator"));
        assert_eq!(frame_type(out.recv().await.unwrap()), "force_logout");
        assert_eq!(frame_type(out.recv().await.unwrap()), "close");

        assert!(!hub.kick(Uuid::new_v4(), "nobody"));
    }

    #[tokio::test]
    async fn unregister_twice_publishes_one_disconnect() {
        let (hub, mut events) = hub();
        let (id, _out) = hub.register(client("alice")).await;
        events.recv().await.unwrap();

        hub.unregister(id).await;
        hub.unregister(id).await;

        assert!(matches!(events.recv().await, Some(PresenceEvent::Disconnected { .. })));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_queue_still_disconnects_through_unregister() {
        let (hub, mut events) = hub();
        let (alice, alice_out) = hub.register(client("alice")).await;
        drop(alice_out);
        let (_, mut bob_out) = hub.register(client("bob")).await;
        bob_out.recv().await.unwrap();
        bob_out.recv().await.unwrap();

        // bob's user_online broadcast hit alice's closed queue
        assert!(hub.is_connected(alice));

        hub.unregister(alice).await;
        assert_eq!(frame_type(bob_out.recv().await.unwrap()), "user_offline");

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(match event {
                PresenceEvent::Connected { .. } => "connected",
                PresenceEvent::Heartbeat { .. } => "heartbeat",
                PresenceEvent::Disconnected { connection_id, .. } => {
                    assert_eq!(connection_id, alice);
                    "disconnected"
                }
            });
        }
        assert_eq!(kinds, vec!["connected", "connected", "disconnected"]);
    }
}
