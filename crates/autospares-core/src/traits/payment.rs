// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment adapter trait for mobile-money STK push providers.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{StkPushAck, StkPushRequest};

/// Adapter for a mobile-money provider that can prompt a phone for payment.
///
/// The outcome of the prompt arrives later through the provider's callback,
/// not through this trait.
#[async_trait]
pub trait PaymentAdapter: PluginAdapter {
    /// Sends a payment prompt to the customer's phone.
    async fn initiate_stk_push(&self, request: StkPushRequest) -> Result<StkPushAck, StoreError>;
}
