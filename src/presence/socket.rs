// GET /hubs/chat - WebSocket endpoint for presence.
//
// Browsers cannot set headers on a WebSocket handshake, so the access token
// is read from `?access_token=` first and the Authorization header second.

use axum::{
    async_trait,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, FromRequestParts, Query, State,
    },
    http::{header, request::Parts, HeaderMap},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;

use super::hub::{HubClient, PresenceHub};
use super::messages::{ClientMessage, ServerMessage};
use crate::auth::decode_access_token;
use crate::error::ApiError;
use crate::middleware::auth::client_ip;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
struct HubQuery {
    access_token: Option<String>,
}

/// Caller of the hub endpoint, authenticated before the upgrade happens
#[derive(Debug, Clone)]
pub struct HubCaller(pub HubClient);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for HubCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<HubQuery>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::bad_request("Invalid query string"))?;

        let token = query
            .access_token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| bearer_token(&parts.headers))
            .ok_or_else(|| ApiError::unauthorized("Missing access token"))?;

        let claims = decode_access_token(&token)?;

        let connect_info = Option::<ConnectInfo<SocketAddr>>::from_request_parts(parts, state)
            .await
            .ok()
            .flatten();

        Ok(HubCaller(HubClient {
            user_id: claims.sub,
            username: claims.username,
            ip_address: client_ip(&parts.headers, connect_info.map(|ConnectInfo(addr)| addr)),
            user_agent: parts
                .headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub async fn chat_hub(
    HubCaller(client): HubCaller,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| serve_socket(socket, hub, client))
}

async fn serve_socket(socket: WebSocket, hub: Arc<PresenceHub>, client: HubClient) {
    let (mut sink, mut stream) = socket.split();
    let (connection_id, mut outbound) = hub.register(client).await;

    // Forward queued frames; a Close frame ends the writer
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let is_close = matches!(message, Message::Close(_));
            if sink.send(message).await.is_err() {
                break;
            }
            if is_close {
                let _ = sink.close().await;
                break;
            }
        }
    });

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_text(&hub, connection_id, &text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(%connection_id, "Hub socket error: {}", e);
                        break;
                    }
                }
            }
            _ = &mut send_task => break,
        }
    }

    hub.unregister(connection_id).await;
    send_task.abort();
}

async fn handle_text(hub: &PresenceHub, connection_id: Uuid, text: &str) {
    let reply = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Heartbeat) => hub.heartbeat(connection_id).await,
        Ok(ClientMessage::GetOnlineUsers) => ServerMessage::OnlineUsers { users: hub.online() },
        Err(_) => ServerMessage::Error {
            message: "Unknown message type".to_string(),
        },
    };
    hub.send_to(connection_id, &reply);
}
