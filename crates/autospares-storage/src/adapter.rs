// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use autospares_config::model::StorageConfig;
use autospares_core::types::{
    CartLine, ChatMessage, ChatSession, MpesaPayment, NewOrder, Order, OrderItem,
    PaymentResult, PaymentSettlement, Product, ProductQuery,
};
use autospares_core::{AdapterType, HealthStatus, PluginAdapter, StorageAdapter, StoreError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened lazily by [`StorageAdapter::initialize`]; every
/// other call fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage. The file is not opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, StoreError> {
        self.db.get().ok_or_else(|| StoreError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), StoreError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, StoreError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), StoreError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| StoreError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.db()?;
        self.checkpoint().await
    }

    // --- Sessions ---

    async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError> {
        queries::sessions::create_session(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<ChatSession>, StoreError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Option<ChatSession>, StoreError> {
        queries::sessions::get_session_by_token(self.db()?, token).await
    }

    async fn touch_session(
        &self,
        id: &str,
        title: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), StoreError> {
        queries::sessions::touch_session(self.db()?, id, title, email, phone).await
    }

    // --- Messages ---

    async fn insert_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn recent_messages(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        queries::messages::recent_messages(self.db()?, session_id, limit).await
    }

    // --- Cart ---

    async fn replace_cart(&self, session_id: &str, lines: &[CartLine]) -> Result<usize, StoreError> {
        queries::cart::replace_cart(self.db()?, session_id, lines).await
    }

    async fn get_cart(&self, session_id: &str) -> Result<Vec<CartLine>, StoreError> {
        queries::cart::get_cart(self.db()?, session_id).await
    }

    // --- Catalog ---

    async fn upsert_product(&self, product: &Product) -> Result<(), StoreError> {
        queries::products::upsert_product(self.db()?, product).await
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        queries::products::list_products(self.db()?, query).await
    }

    async fn get_products(&self, ids: &[String]) -> Result<Vec<Product>, StoreError> {
        queries::products::get_products(self.db()?, ids).await
    }

    // --- Orders ---

    async fn create_order(&self, order: &NewOrder) -> Result<Order, StoreError> {
        queries::orders::create_order(self.db()?, order).await
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        queries::orders::get_order(self.db()?, id).await
    }

    async fn get_order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StoreError> {
        queries::orders::get_order_items(self.db()?, order_id).await
    }

    // --- Payments ---

    async fn create_mpesa_payment(&self, payment: &MpesaPayment) -> Result<(), StoreError> {
        queries::payments::create_mpesa_payment(self.db()?, payment).await
    }

    async fn attach_checkout_ids(
        &self,
        payment_id: &str,
        checkout_request_id: &str,
        merchant_request_id: &str,
    ) -> Result<(), StoreError> {
        queries::payments::attach_checkout_ids(
            self.db()?,
            payment_id,
            checkout_request_id,
            merchant_request_id,
        )
        .await
    }

    async fn fail_mpesa_payment(&self, payment_id: &str, reason: &str) -> Result<(), StoreError> {
        queries::payments::fail_mpesa_payment(self.db()?, payment_id, reason).await
    }

    async fn get_mpesa_payment(&self, id: &str) -> Result<Option<MpesaPayment>, StoreError> {
        queries::payments::get_mpesa_payment(self.db()?, id).await
    }

    async fn get_mpesa_payment_by_checkout(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<MpesaPayment>, StoreError> {
        queries::payments::get_mpesa_payment_by_checkout(self.db()?, checkout_request_id).await
    }

    async fn settle_payment(
        &self,
        result: &PaymentResult,
    ) -> Result<Option<PaymentSettlement>, StoreError> {
        queries::payments::settle_payment(self.db()?, result).await
    }
}
