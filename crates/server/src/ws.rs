//! Per-user push delivery. Each connection subscribes to exactly one Redis
//! pub/sub channel, `user_queue_<user_id>`, and forwards every message
//! published there verbatim — scoped per-topic instead of one global
//! channel, since room assignments are addressed to individual users, not
//! broadcast to everyone.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{error, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    user_id: i64,
}

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, query.user_id))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>, user_id: i64) {
    let topic = lyncup_core::push_topic(lyncup_core::UserId(user_id));

    let mut pubsub = match state.redis_client.get_async_pubsub().await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, user_id, "ws: failed to open redis pub/sub connection");
            return;
        }
    };
    if let Err(e) = pubsub.subscribe(&topic).await {
        error!(error = %e, %topic, "ws: failed to subscribe to topic");
        return;
    }

    let (mut sender, mut receiver) = socket.split();
    let mut messages = pubsub.into_on_message();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = messages.next().await {
            let payload: String = match msg.get_payload() {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "ws: dropped non-utf8 pub/sub payload");
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Consume (and discard) client frames — pings and close frames are the
    // only traffic expected from this direction.
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
}
