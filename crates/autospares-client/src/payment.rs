// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling an M-Pesa payment until it settles.
//!
//! The STK prompt is answered on the shopper's phone, so the client checks
//! `GET /v1/payments/{id}` after a short delay and then at a fixed interval.
//! The loop makes at most `max_attempts` status requests.

use std::time::Duration;

use async_trait::async_trait;
use autospares_core::StoreError;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, PaymentStatusView};

pub const TIMEOUT_MESSAGE: &str =
    "Payment verification timed out. Please contact support if money was deducted.";
pub const FAILED_MESSAGE: &str = "Payment failed";
pub const UNVERIFIED_MESSAGE: &str = "Unable to verify payment status";

/// Where payment status comes from.
#[async_trait]
pub trait PaymentStatusSource: Send + Sync {
    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatusView, StoreError>;
}

#[async_trait]
impl PaymentStatusSource for ApiClient {
    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatusView, StoreError> {
        ApiClient::payment_status(self, payment_id).await
    }
}

/// How a polling loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Completed { receipt: Option<String> },
    Failed { reason: String },
    TimedOut { attempts: u32 },
}

impl PaymentOutcome {
    /// Text shown to the shopper.
    pub fn message(&self) -> String {
        match self {
            PaymentOutcome::Completed {
                receipt: Some(receipt),
            } => format!("Payment successful! Receipt: {receipt}"),
            PaymentOutcome::Completed { receipt: None } => "Payment successful!".to_string(),
            PaymentOutcome::Failed { reason } => reason.clone(),
            PaymentOutcome::TimedOut { .. } => TIMEOUT_MESSAGE.to_string(),
        }
    }
}

/// Polling schedule for one payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentPoller {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PaymentPoller {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            interval: Duration::from_secs(5),
            max_attempts: 30,
        }
    }
}

impl PaymentPoller {
    /// Poll until the payment completes, fails, or the attempt budget runs out.
    pub async fn poll(
        &self,
        source: &dyn PaymentStatusSource,
        payment_id: &str,
    ) -> PaymentOutcome {
        tokio::time::sleep(self.initial_delay).await;

        for attempt in 1..=self.max_attempts {
            let view = match source.payment_status(payment_id).await {
                Ok(view) => view,
                Err(e) => {
                    warn!(payment_id, attempt, error = %e, "payment status check failed");
                    return PaymentOutcome::Failed {
                        reason: format!("{UNVERIFIED_MESSAGE}: {e}"),
                    };
                }
            };

            match view.status.as_str() {
                "completed" => {
                    info!(payment_id, attempt, "payment completed");
                    return PaymentOutcome::Completed {
                        receipt: view.mpesa_receipt_number,
                    };
                }
                "failed" => {
                    info!(payment_id, attempt, result_code = ?view.result_code, "payment failed");
                    return PaymentOutcome::Failed {
                        reason: view
                            .result_desc
                            .filter(|d| !d.trim().is_empty())
                            .unwrap_or_else(|| FAILED_MESSAGE.to_string()),
                    };
                }
                status => debug!(payment_id, attempt, status, "payment still pending"),
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        warn!(payment_id, attempts = self.max_attempts, "payment verification timed out");
        PaymentOutcome::TimedOut {
            attempts: self.max_attempts,
        }
    }
}
