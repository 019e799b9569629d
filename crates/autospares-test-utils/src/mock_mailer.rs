// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock invoice mailer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use autospares_core::types::{AdapterType, HealthStatus, Invoice};
use autospares_core::{MailAdapter, PluginAdapter, StoreError};

/// Captures invoices instead of delivering them.
#[derive(Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<Invoice>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Invoice> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockMailer {
    fn name(&self) -> &str {
        "mock-mailer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Mail
    }

    async fn health_check(&self) -> Result<HealthStatus, StoreError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl MailAdapter for MockMailer {
    async fn send_invoice(&self, invoice: &Invoice) -> Result<String, StoreError> {
        let mut sent = self.sent.lock().await;
        sent.push(invoice.clone());
        Ok(format!("<mock-{}@autospareskenya.com>", sent.len()))
    }
}
