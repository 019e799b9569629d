// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mail adapter trait for transactional email.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Invoice;

/// Adapter for delivering transactional email.
#[async_trait]
pub trait MailAdapter: PluginAdapter {
    /// Renders and sends an invoice, returning the transport's message id.
    async fn send_invoice(&self, invoice: &Invoice) -> Result<String, StoreError>;
}
