// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client side of the AutoSpares storefront API.
//!
//! - [`store`] keeps the shopper's cart and persists it per client
//! - [`session`] caches the session id/token pair issued by the server
//! - [`sync`] pushes cart changes to the server, debounced and retried
//! - [`realtime`] receives server cart pushes, falling back to polling
//! - [`payment`] polls an M-Pesa payment until it settles or times out

pub mod api;
pub mod backoff;
pub mod payment;
pub mod realtime;
pub mod session;
pub mod store;
pub mod sync;

pub use api::{ApiClient, PaymentStatusView, SessionPair};
pub use backoff::Backoff;
pub use payment::{PaymentOutcome, PaymentPoller, PaymentStatusSource};
pub use realtime::RealtimeCart;
pub use session::SessionCache;
pub use store::{CartPersistence, CartStore, JsonFilePersistence, MemoryPersistence, ProductCard};
pub use sync::{CartSyncer, SyncOptions};

/// Default directory for the persisted cart and session files.
pub fn default_state_dir() -> std::path::PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|p| p.join("autospares"))
        .unwrap_or_else(|| std::path::PathBuf::from(".autospares"))
}
