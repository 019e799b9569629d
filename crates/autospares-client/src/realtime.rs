// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-pushed cart updates.
//!
//! [`RealtimeCart`] listens on `GET /ws?token=...` and forwards every cart
//! snapshot the server pushes. Dropped sockets are reconnected with
//! [`Backoff`]; a socket that closes before delivering any frame counts
//! against the attempt budget like a refused connect. When the budget is
//! spent it falls back to polling `GET /v1/cart` at a fixed interval for the
//! rest of its life.

use std::time::Duration;

use autospares_core::StoreError;
use autospares_core::types::{CartFrame, CartSummary};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::backoff::Backoff;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// How a socket session ended.
enum SocketEnd {
    /// The server closed or the connection dropped.
    Dropped { frames: usize },
    /// Nobody is listening for updates any more.
    ReceiverGone,
}

/// Subscribes to cart changes for one session.
#[derive(Debug, Clone)]
pub struct RealtimeCart {
    api: ApiClient,
    token: String,
    backoff: Backoff,
    poll_interval: Duration,
}

impl RealtimeCart {
    pub fn new(api: ApiClient, token: impl Into<String>) -> Self {
        Self {
            api,
            token: token.into(),
            backoff: Backoff::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Forward each distinct cart snapshot to `updates` until `cancel` fires
    /// or the receiver is dropped.
    pub async fn run(self, updates: mpsc::Sender<CartSummary>, cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => debug!("realtime cart cancelled"),
            _ = self.drive(&updates) => debug!("realtime cart receiver dropped"),
        }
    }

    async fn drive(&self, updates: &mpsc::Sender<CartSummary>) {
        let mut last: Option<CartSummary> = None;
        let mut failures = 0u32;

        loop {
            let error = match self.listen(updates, &mut last).await {
                Ok(SocketEnd::ReceiverGone) => return,
                Ok(SocketEnd::Dropped { frames }) if frames > 0 => {
                    failures = 0;
                    info!(frames, "cart socket dropped, reconnecting");
                    tokio::time::sleep(self.backoff.delay(0)).await;
                    continue;
                }
                Ok(SocketEnd::Dropped { .. }) => "closed before any frame".to_string(),
                Err(e) => e.to_string(),
            };
            failures += 1;
            if !self.backoff.allows(failures) {
                warn!(%error, failures, "cart socket unavailable, falling back to polling");
                break;
            }
            let delay = self.backoff.delay(failures - 1);
            debug!(%error, failures, ?delay, "cart socket attempt failed");
            tokio::time::sleep(delay).await;
        }

        self.poll(updates, &mut last).await;
    }

    async fn listen(
        &self,
        updates: &mpsc::Sender<CartSummary>,
        last: &mut Option<CartSummary>,
    ) -> Result<SocketEnd, StoreError> {
        let (socket, _) = connect_async(self.api.cart_socket_url(&self.token)?)
            .await
            .map_err(|e| StoreError::Transport {
                message: format!("cart socket connect failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        info!("cart socket connected");

        let (mut sink, mut stream) = socket.split();
        let mut keepalive = tokio::time::interval(KEEPALIVE_INTERVAL);
        keepalive.tick().await;
        let mut frames = 0usize;

        loop {
            tokio::select! {
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        frames += 1;
                        match serde_json::from_str::<CartFrame>(&text) {
                            Ok(CartFrame::CartUpdated { cart }) => {
                                if !forward(updates, last, cart).await {
                                    return Ok(SocketEnd::ReceiverGone);
                                }
                            }
                            Ok(CartFrame::Pong) => debug!("cart socket pong"),
                            Ok(CartFrame::Ping) => {}
                            Err(e) => warn!("invalid cart frame: {e}"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(SocketEnd::Dropped { frames }),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("cart socket error: {e}");
                        return Ok(SocketEnd::Dropped { frames });
                    }
                },
                _ = keepalive.tick() => {
                    let ping = serde_json::to_string(&CartFrame::Ping)?;
                    if sink.send(Message::Text(ping.into())).await.is_err() {
                        return Ok(SocketEnd::Dropped { frames });
                    }
                }
            }
        }
    }

    async fn poll(&self, updates: &mpsc::Sender<CartSummary>, last: &mut Option<CartSummary>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            match self.api.get_cart(&self.token).await {
                Ok(cart) => {
                    if !forward(updates, last, cart).await {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "cart poll failed"),
            }
        }
    }
}

/// Send `cart` unless it equals the last snapshot. Returns `false` once the
/// receiver is gone.
async fn forward(
    updates: &mpsc::Sender<CartSummary>,
    last: &mut Option<CartSummary>,
    cart: CartSummary,
) -> bool {
    if last.as_ref() == Some(&cart) {
        return true;
    }
    *last = Some(cart.clone());
    updates.send(cart).await.is_ok()
}
