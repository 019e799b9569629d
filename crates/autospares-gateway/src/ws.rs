// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket cart push.
//!
//! Server -> Client (JSON):
//! ```json
//! {"type": "cart_updated", "cart": {"items": [], "total_items": 0, ...}}
//! {"type": "pong"}
//! ```
//!
//! Client -> Server (JSON):
//! ```json
//! {"type": "ping"}
//! ```
//!
//! The current cart is sent right after the upgrade, then again on every
//! change to the session's cart rows.

use autospares_agent::CartService;
use autospares_core::types::{CartFrame, CartSummary};
use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};

use crate::error::ApiError;
use crate::server::AppState;

/// Query parameters for GET /ws.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// WebSocket upgrade handler.
///
/// The token is checked before upgrading; unknown or missing tokens get a 401.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let token = params
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("missing session token"))?;
    let session = state
        .engine
        .sessions()
        .lookup(token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("unknown session token"))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state.services.cart, session.id)))
}

/// Handle one cart subscription.
///
/// Three tasks share the socket: the sender drains an mpsc channel into the
/// socket, the pusher forwards cart events into that channel, and this
/// function reads client frames until the socket closes.
async fn handle_socket(socket: WebSocket, cart: CartService, session_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<CartFrame>(32);

    // Subscribe before reading the snapshot so no change falls in between.
    let updates = cart.events().subscribe(&session_id);

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("failed to encode cart frame: {e}");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    match cart.summary(&session_id).await {
        Ok(summary) => {
            let _ = tx.send(CartFrame::CartUpdated { cart: summary }).await;
        }
        Err(e) => tracing::warn!(%session_id, "failed to load cart snapshot: {e}"),
    }

    let push_task = tokio::spawn(push_updates(
        updates,
        cart.clone(),
        session_id.clone(),
        tx.clone(),
    ));
    tracing::debug!(%session_id, "cart socket opened");

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<CartFrame>(&text) {
                Ok(CartFrame::Ping) => {
                    if tx.send(CartFrame::Pong).await.is_err() {
                        break;
                    }
                }
                Ok(frame) => tracing::debug!(?frame, "ignoring client frame"),
                Err(e) => tracing::warn!("invalid WebSocket message: {e}"),
            },
            Message::Close(_) => break,
            _ => {} // Binary and protocol pings are handled by the transport.
        }
    }

    push_task.abort();
    sender_task.abort();
    // The receiver lives in the push task; wait for it to drop before release.
    let _ = push_task.await;
    cart.events().release(&session_id);
    tracing::debug!(%session_id, "cart socket closed");
}

/// Forward cart events for one session into the socket's outbound channel.
///
/// A lagging receiver skips straight to a fresh snapshot.
async fn push_updates(
    mut updates: broadcast::Receiver<CartSummary>,
    cart: CartService,
    session_id: String,
    tx: mpsc::Sender<CartFrame>,
) {
    loop {
        let summary = match updates.recv().await {
            Ok(summary) => summary,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(%session_id, skipped, "cart socket lagged, resending snapshot");
                match cart.summary(&session_id).await {
                    Ok(summary) => summary,
                    Err(e) => {
                        tracing::warn!(%session_id, "failed to reload cart: {e}");
                        continue;
                    }
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        if tx.send(CartFrame::CartUpdated { cart: summary }).await.is_err() {
            break;
        }
    }
}
