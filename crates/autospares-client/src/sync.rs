// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounced, retried push of the local cart to `PUT /v1/cart`.
//!
//! Mutations call [`CartSyncer::schedule`] with the full cart. Bursts within
//! the debounce window collapse into one request carrying the latest cart.
//! Transport failures are retried with [`Backoff`]; once the budget is spent
//! the local cart stays authoritative and the next schedule starts over.

use std::time::Duration;

use autospares_core::StoreError;
use autospares_core::types::CartLine;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::backoff::Backoff;

/// Timing for [`CartSyncer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncOptions {
    pub debounce: Duration,
    pub backoff: Backoff,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(800),
            backoff: Backoff::default(),
        }
    }
}

enum Command {
    Schedule(Vec<CartLine>),
    Flush(oneshot::Sender<Result<(), StoreError>>),
}

/// Handle to the background sync task for one session.
pub struct CartSyncer {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl CartSyncer {
    pub fn spawn(api: ApiClient, token: String, options: SyncOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(api, token, options, rx));
        Self { tx, task }
    }

    /// Queue `lines` to be sent once the debounce window closes.
    pub fn schedule(&self, lines: Vec<CartLine>) {
        if self.tx.send(Command::Schedule(lines)).is_err() {
            warn!("cart sync task is gone, change not scheduled");
        }
    }

    /// Send any queued cart now, in a single attempt.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply))
            .map_err(|_| StoreError::Internal("cart sync task is gone".into()))?;
        rx.await
            .map_err(|_| StoreError::Internal("cart sync task dropped the flush".into()))?
    }

    /// Flush and stop the background task.
    pub async fn shutdown(self) -> Result<(), StoreError> {
        let result = self.flush().await;
        drop(self.tx);
        let _ = self.task.await;
        result
    }
}

async fn run(
    api: ApiClient,
    token: String,
    options: SyncOptions,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut queued: Option<Vec<CartLine>> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let window = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Schedule(lines)) => {
                    queued = Some(lines);
                    deadline = Some(Instant::now() + options.debounce);
                }
                Some(Command::Flush(reply)) => {
                    deadline = None;
                    let result = match queued.take() {
                        Some(lines) => send_once(&api, &token, &lines).await,
                        None => Ok(()),
                    };
                    let _ = reply.send(result);
                }
                None => break,
            },
            _ = window => {
                deadline = None;
                if let Some(lines) = queued.take() {
                    send_with_retry(&api, &token, &lines, &options.backoff).await;
                }
            }
        }
    }
    debug!("cart sync task stopped");
}

async fn send_once(api: &ApiClient, token: &str, lines: &[CartLine]) -> Result<(), StoreError> {
    let summary = api.put_cart(token, lines).await?;
    debug!(total_items = summary.total_items, "cart synced");
    Ok(())
}

/// Returns whether the server accepted the cart.
async fn send_with_retry(api: &ApiClient, token: &str, lines: &[CartLine], backoff: &Backoff) -> bool {
    let mut attempts = 0;
    loop {
        match send_once(api, token, lines).await {
            Ok(()) => return true,
            Err(e @ StoreError::Transport { .. }) => {
                attempts += 1;
                if !backoff.allows(attempts) {
                    warn!(error = %e, attempts, "cart sync gave up, keeping local cart");
                    return false;
                }
                let delay = backoff.delay(attempts - 1);
                warn!(error = %e, attempts, ?delay, "cart sync failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(error = %e, "server rejected cart sync");
                return false;
            }
        }
    }
}
