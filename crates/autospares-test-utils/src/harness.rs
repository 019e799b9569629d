// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full storefront stack with mock adapters and
//! a temp SQLite database. [`TestHarness::send_message`] drives the chat
//! engine the same way the HTTP layer does, reusing one session token.

use std::sync::Arc;

use autospares_agent::{
    CartEvents, CartService, ChatEngine, ChatReply, ChatRequest, OrderService, PaymentService,
    ToolServices,
};
use autospares_config::StoreConfig;
use autospares_core::types::Product;
use autospares_core::{StorageAdapter, StoreError};
use autospares_storage::SqliteStorage;
use tokio::sync::Mutex;

use crate::mock_mailer::MockMailer;
use crate::mock_payment::MockPaymentGateway;
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    products: Vec<Product>,
    config: StoreConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            products: Vec::new(),
            config: StoreConfig::default(),
        }
    }

    /// Set mock provider text responses.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Seed the catalog before the harness is returned.
    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    /// Start from a custom configuration. The storage path is always replaced.
    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, StoreError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| StoreError::Storage { source: e.into() })?;
        let mut config = self.config;
        config.storage.database_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned();

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        for product in &self.products {
            storage.upsert_product(product).await?;
        }

        let mock_provider = Arc::new(if self.responses.is_empty() {
            MockProvider::new()
        } else {
            MockProvider::with_responses(self.responses)
        });
        let mock_gateway = Arc::new(MockPaymentGateway::new());
        let mock_mailer = Arc::new(MockMailer::new());

        let events = CartEvents::new();
        let services = ToolServices {
            storage: storage.clone(),
            cart: CartService::new(storage.clone(), events.clone()),
            orders: OrderService::new(storage.clone(), config.checkout.clone()),
            payments: PaymentService::new(storage.clone(), mock_gateway.clone()),
        };
        let engine = Arc::new(ChatEngine::new(
            mock_provider.clone(),
            services.clone(),
            config.chat.clone(),
        ));

        Ok(TestHarness {
            mock_provider,
            mock_gateway,
            mock_mailer,
            storage,
            events,
            services,
            engine,
            config,
            token: Mutex::new(None),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub mock_provider: Arc<MockProvider>,
    pub mock_gateway: Arc<MockPaymentGateway>,
    pub mock_mailer: Arc<MockMailer>,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    pub events: CartEvents,
    pub services: ToolServices,
    pub engine: Arc<ChatEngine>,
    pub config: StoreConfig,
    token: Mutex<Option<String>>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Send a message as one client and return the reply.
    ///
    /// The first reply's token is cached and presented on later calls.
    pub async fn send_message(&self, text: &str) -> Result<ChatReply, StoreError> {
        let mut token = self.token.lock().await;
        let reply = self
            .engine
            .handle(ChatRequest {
                message: text.to_string(),
                session_token: token.clone(),
                ..Default::default()
            })
            .await?;
        *token = Some(reply.session_token.clone());
        Ok(reply)
    }

    /// Add a text response to the mock provider's queue.
    pub async fn add_provider_response(&self, text: &str) {
        self.mock_provider.push_text(text).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::sample_product;

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let harness = TestHarness::builder()
            .with_products(vec![sample_product("p1", "Clutch Kit", 14500.0)])
            .build()
            .await
            .unwrap();
        assert_eq!(harness.engine.tools().len(), 8);
        assert_eq!(
            harness.storage.get_products(&["p1".into()]).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn send_message_reuses_the_session() {
        let harness = TestHarness::builder()
            .with_mock_responses(vec!["Karibu!".into(), "Sure.".into()])
            .build()
            .await
            .unwrap();
        let first = harness.send_message("hello").await.unwrap();
        assert_eq!(first.response, "Karibu!");
        let second = harness.send_message("brake pads please").await.unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.session_token, first.session_token);
    }
}
