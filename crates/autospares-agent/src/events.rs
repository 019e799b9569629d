// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session cart change notifications.
//!
//! Every write to a session's cart rows publishes the new [`CartSummary`];
//! WebSocket connections subscribe by session id.

use std::sync::Arc;

use autospares_core::types::CartSummary;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

/// Snapshots buffered per session before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 16;

/// Fan-out hub keyed by session id.
#[derive(Clone, Default)]
pub struct CartEvents {
    channels: Arc<DashMap<String, broadcast::Sender<CartSummary>>>,
}

impl CartEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to cart snapshots for `session_id`.
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<CartSummary> {
        self.channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes a snapshot. Returns the number of subscribers reached.
    pub fn publish(&self, session_id: &str, summary: &CartSummary) -> usize {
        let Some(sender) = self.channels.get(session_id).map(|s| s.clone()) else {
            return 0;
        };
        match sender.send(summary.clone()) {
            Ok(n) => {
                trace!(session_id, subscribers = n, "cart snapshot published");
                n
            }
            Err(_) => {
                self.channels
                    .remove_if(session_id, |_, s| s.receiver_count() == 0);
                0
            }
        }
    }

    /// Drops the session's channel once its last subscriber is gone.
    ///
    /// Connections call this after dropping their receiver; a channel that
    /// another connection still listens on is kept.
    pub fn release(&self, session_id: &str) {
        if self
            .channels
            .remove_if(session_id, |_, s| s.receiver_count() == 0)
            .is_some()
        {
            trace!(session_id, "cart channel released");
        }
    }

    /// Number of sessions with a live channel.
    pub fn session_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(qty: u32) -> CartSummary {
        CartSummary::from_lines(vec![autospares_core::types::CartLine {
            product_id: "p".into(),
            product_name: "Fan Belt".into(),
            brand: None,
            quantity: qty,
            unit_price: 900.0,
            image_url: None,
        }])
    }

    #[tokio::test]
    async fn subscribers_receive_their_session_only() {
        let events = CartEvents::new();
        let mut a = events.subscribe("a");
        let mut b = events.subscribe("b");

        assert_eq!(events.publish("a", &summary(2)), 1);
        assert_eq!(a.recv().await.unwrap().total_items, 2);
        assert!(b.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let events = CartEvents::new();
        assert_eq!(events.publish("nobody", &summary(1)), 0);
        assert_eq!(events.session_count(), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let events = CartEvents::new();
        drop(events.subscribe("gone"));
        assert_eq!(events.session_count(), 1);
        assert_eq!(events.publish("gone", &summary(1)), 0);
        assert_eq!(events.session_count(), 0);
    }

    #[test]
    fn release_keeps_channels_with_listeners() {
        let events = CartEvents::new();
        let first = events.subscribe("s");
        let second = events.subscribe("s");

        drop(first);
        events.release("s");
        assert_eq!(events.session_count(), 1);

        drop(second);
        events.release("s");
        assert_eq!(events.session_count(), 0);

        // Unknown sessions are a no-op.
        events.release("never-seen");
        assert_eq!(events.session_count(), 0);
    }
}
