// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock STK push gateway.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use autospares_core::types::{AdapterType, HealthStatus, StkPushAck, StkPushRequest};
use autospares_core::{PaymentAdapter, PluginAdapter, StoreError};

/// Accepts every push with sequential checkout ids, or rejects every push.
pub struct MockPaymentGateway {
    requests: Arc<Mutex<Vec<StkPushRequest>>>,
    counter: AtomicU64,
    reject_with: Option<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            counter: AtomicU64::new(0),
            reject_with: None,
        }
    }

    /// A gateway whose pushes all fail with a payment error.
    pub fn failing(message: &str) -> Self {
        Self {
            reject_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Every push request received, in order.
    pub async fn requests(&self) -> Vec<StkPushRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockPaymentGateway {
    fn name(&self) -> &str {
        "mock-mpesa"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Payment
    }

    async fn health_check(&self) -> Result<HealthStatus, StoreError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl PaymentAdapter for MockPaymentGateway {
    async fn initiate_stk_push(&self, request: StkPushRequest) -> Result<StkPushAck, StoreError> {
        self.requests.lock().await.push(request);
        if let Some(message) = &self.reject_with {
            return Err(StoreError::Payment {
                message: message.clone(),
                source: None,
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StkPushAck {
            merchant_request_id: format!("mock-merchant-{n}"),
            checkout_request_id: format!("ws_CO_mock_{n}"),
            response_code: "0".to_string(),
            response_description: "Success. Request accepted for processing".to_string(),
            customer_message: Some("Success. Request accepted for processing".to_string()),
        })
    }
}
