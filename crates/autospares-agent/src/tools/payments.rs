// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! M-Pesa payment tool.

use async_trait::async_trait;
use autospares_core::{StoreError, format_ksh};
use serde::Deserialize;
use serde_json::json;

use super::{Tool, ToolContext, ToolOutput, parse_args};
use crate::payments::PaymentService;

#[derive(Debug, Deserialize)]
struct PaymentArgs {
    phone_number: String,
    amount: f64,
    #[serde(default)]
    order_id: Option<String>,
}

/// Prompts the customer's phone for an M-Pesa payment.
pub struct InitiatePaymentTool {
    payments: PaymentService,
}

impl InitiatePaymentTool {
    pub fn new(payments: PaymentService) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl Tool for InitiatePaymentTool {
    fn name(&self) -> &str {
        "initiate_mpesa_payment"
    }

    fn description(&self) -> &str {
        "Send an M-Pesa STK push payment prompt to the customer's phone"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "phone_number": {
                    "type": "string",
                    "description": "M-Pesa phone number (07xx, 01xx or 254xxxxxxxxx)"
                },
                "amount": { "type": "number", "description": "Payment amount in KES" },
                "order_id": { "type": "string", "description": "Associated order ID" }
            },
            "required": ["phone_number", "amount"]
        })
    }

    async fn invoke(
        &self,
        _ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<ToolOutput, StoreError> {
        let args: PaymentArgs = parse_args(self.name(), input)?;
        let initiated = self
            .payments
            .initiate(&args.phone_number, args.amount, args.order_id.as_deref())
            .await?;
        Ok(ToolOutput::success(json!({
            "payment_id": initiated.payment_id,
            "checkout_request_id": initiated.checkout_request_id,
            "status": initiated.status,
            "message": format!(
                "M-Pesa payment of {} initiated to {}. Please check your phone for the payment prompt.",
                format_ksh(initiated.amount as f64),
                initiated.phone_number
            ),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::{ctx, services};
    use autospares_test_utils::storage::temp_storage;

    #[tokio::test]
    async fn initiates_and_describes_payment() {
        let (storage, _dir) = temp_storage().await;
        let tool = InitiatePaymentTool::new(services(storage).payments);
        let out = tool
            .invoke(&ctx("s1"), json!({"phone_number": "0712345678", "amount": 2450}))
            .await
            .unwrap();
        assert_eq!(out.content["status"], "initiated");
        assert_eq!(
            out.content["message"],
            "M-Pesa payment of KSh 2,450 initiated to 254712345678. Please check your phone for the payment prompt."
        );
    }

    #[tokio::test]
    async fn bad_phone_is_an_error() {
        let (storage, _dir) = temp_storage().await;
        let tool = InitiatePaymentTool::new(services(storage).payments);
        let err = tool
            .invoke(&ctx("s1"), json!({"phone_number": "999", "amount": 10}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }
}
