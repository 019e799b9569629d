// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for LLM integrations with function calling.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for LLM providers.
///
/// A single round trip: the caller sends the conversation plus the tool
/// declarations and receives text and/or function calls back.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a generation request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, StoreError>;
}
