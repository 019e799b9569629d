// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod mail;
pub mod payment;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use mail::MailAdapter;
pub use payment::PaymentAdapter;
pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;
