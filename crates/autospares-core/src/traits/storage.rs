// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::StoreError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    CartLine, ChatMessage, ChatSession, MpesaPayment, NewOrder, Order, OrderItem,
    PaymentResult, PaymentSettlement, Product, ProductQuery,
};

/// Adapter for storage and persistence backends.
///
/// Owns every table the storefront touches: chat sessions and their message
/// log, the per-session cart, the catalog, orders, and payment records.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), StoreError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), StoreError>;

    // --- Sessions ---

    async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError>;

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, StoreError>;

    async fn get_session_by_token(&self, token: &str) -> Result<Option<ChatSession>, StoreError>;

    /// Bumps `updated_at` and overwrites title/email/phone where `Some`.
    async fn touch_session(
        &self,
        id: &str,
        title: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), StoreError>;

    // --- Messages ---

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), StoreError>;

    /// The newest `limit` messages of a session, oldest first.
    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    // --- Cart ---

    /// Replaces every cart row of the session with `lines`. Returns the row count written.
    async fn replace_cart(&self, session_id: &str, lines: &[CartLine]) -> Result<usize, StoreError>;

    async fn get_cart(&self, session_id: &str) -> Result<Vec<CartLine>, StoreError>;

    // --- Catalog ---

    async fn upsert_product(&self, product: &Product) -> Result<(), StoreError>;

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError>;

    async fn get_products(&self, ids: &[String]) -> Result<Vec<Product>, StoreError>;

    // --- Orders ---

    /// Writes the customer, the order and its items in one transaction.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, StoreError>;

    async fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError>;

    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StoreError>;

    // --- Payments ---

    async fn create_mpesa_payment(&self, payment: &MpesaPayment) -> Result<(), StoreError>;

    async fn attach_checkout_ids(
        &self,
        payment_id: &str,
        checkout_request_id: &str,
        merchant_request_id: &str,
    ) -> Result<(), StoreError>;

    /// Marks a pending payment failed without a provider callback (push rejected).
    async fn fail_mpesa_payment(&self, payment_id: &str, reason: &str) -> Result<(), StoreError>;

    async fn get_mpesa_payment(&self, id: &str) -> Result<Option<MpesaPayment>, StoreError>;

    async fn get_mpesa_payment_by_checkout(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<MpesaPayment>, StoreError>;

    /// Settles the matching pending payment from a callback result.
    ///
    /// A completed payment tied to an order also confirms the order and
    /// appends a `payments` ledger row; all three writes commit together.
    /// Returns `None` when no pending payment matched (unknown checkout id,
    /// or a duplicate callback for a settled payment).
    async fn settle_payment(
        &self,
        result: &PaymentResult,
    ) -> Result<Option<PaymentSettlement>, StoreError>;
}
