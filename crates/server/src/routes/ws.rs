//! The streaming suggestion session route, `GET /ws?user_id=...`
//! (spec.md §4.7, §6).
//!
//! Grounded on `cool-japan/legalis`'s `legalis-api::websocket::handle_socket`
//! split-socket pattern: the socket is split into a sender/receiver half and
//! driven by two tasks. Here the actual debounce/rate-limit/retrieval logic
//! lives entirely in [`citegraph_session`]; this module only bridges the
//! native WebSocket frames to the session actor's channels.

use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use citegraph_core::types::UserId;
use citegraph_session::{Inbound, SessionDeps, TransportEvent};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    user_id: UserId,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query.user_id, state))
}

async fn handle_socket(socket: WebSocket, user_id: UserId, state: Arc<AppState>) {
    tracing::info!(%user_id, "ws_connection_established");

    let deps = SessionDeps {
        store: state.store.clone(),
        embedder: state.embedder.clone(),
        reranker: state.reranker.clone(),
        papers: state.paper_provider(),
        cfg: state.config.clone(),
    };
    let mut handle = citegraph_session::spawn(user_id, deps);
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Ok(()) = handle.suggestions.changed() => {
                    let Some(message) = handle.suggestions.borrow_and_update().clone() else {
                        continue;
                    };
                    let Ok(json) = serde_json::to_string(&message) else { continue };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Some(message) = handle.control.recv() => {
                    let Ok(json) = serde_json::to_string(&message) else { continue };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Some(event) = handle.transport_events.recv() => {
                    match event {
                        TransportEvent::SendPing => {
                            if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                                break;
                            }
                        }
                        TransportEvent::CloseUnresponsive => {
                            let _ = sender.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }
                else => break,
            }
        }
    });

    let inbound_tx = handle.inbound.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str(&text) {
                    Ok(parsed) => {
                        if inbound_tx.send(Inbound::Message(parsed)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%user_id, %err, "malformed_client_message");
                    }
                },
                Ok(Message::Pong(_)) => {
                    if inbound_tx.send(Inbound::Pong).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(%user_id, "ws_connection_closed");
}
