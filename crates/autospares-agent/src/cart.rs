// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-side mirror of the client cart.

use std::sync::Arc;

use autospares_core::types::{CartLine, CartSummary};
use autospares_core::{StorageAdapter, StoreError};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::events::CartEvents;

/// Validates, stores and broadcasts session carts.
#[derive(Clone)]
pub struct CartService {
    storage: Arc<dyn StorageAdapter>,
    events: CartEvents,
    /// Serializes write-then-publish per session.
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl CartService {
    pub fn new(storage: Arc<dyn StorageAdapter>, events: CartEvents) -> Self {
        Self {
            storage,
            events,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn events(&self) -> &CartEvents {
        &self.events
    }

    /// Replaces the session cart with `lines` and notifies subscribers.
    ///
    /// Lines sharing a product id are merged (quantities summed, first line's
    /// details kept). Syncs for one session are applied one at a time, so the
    /// last snapshot published always matches the stored cart.
    pub async fn sync(
        &self,
        session_id: &str,
        lines: Vec<CartLine>,
    ) -> Result<CartSummary, StoreError> {
        let lines = normalize(lines)?;
        let lock = self
            .locks
            .entry(session_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock().await;
        let written = self.storage.replace_cart(session_id, &lines).await?;
        debug!(session_id, lines = written, "cart replaced");

        let summary = CartSummary::from_lines(lines);
        let reached = self.events.publish(session_id, &summary);
        drop(guard);
        drop(lock);
        self.locks
            .remove_if(session_id, |_, l| Arc::strong_count(l) == 1);
        info!(
            session_id,
            total_items = summary.total_items,
            subscribers = reached,
            "cart synced"
        );
        Ok(summary)
    }

    /// Current server view of the session cart.
    pub async fn summary(&self, session_id: &str) -> Result<CartSummary, StoreError> {
        let lines = self.storage.get_cart(session_id).await?;
        Ok(CartSummary::from_lines(lines))
    }
}

/// Rejects malformed lines and merges duplicates, preserving first-seen order.
pub fn normalize(lines: Vec<CartLine>) -> Result<Vec<CartLine>, StoreError> {
    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.product_id.trim().is_empty() {
            return Err(StoreError::Validation(
                "cart item is missing a product id".into(),
            ));
        }
        if line.quantity == 0 {
            return Err(StoreError::Validation(format!(
                "cart item {} must have a quantity of at least 1",
                line.product_id
            )));
        }
        if !line.unit_price.is_finite() || line.unit_price < 0.0 {
            return Err(StoreError::Validation(format!(
                "cart item {} has an invalid price",
                line.product_id
            )));
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            }
            None => merged.push(line),
        }
    }
    Ok(merged)
}
