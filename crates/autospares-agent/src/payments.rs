// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! M-Pesa payment initiation and callback reconciliation.

use std::collections::HashMap;
use std::sync::Arc;

use autospares_core::types::{MpesaPayment, PaymentResult, PaymentStatus, StkPushRequest};
use autospares_core::{PaymentAdapter, StorageAdapter, StoreError, format_ksh};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Returned once the phone has been prompted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiatedPayment {
    pub payment_id: String,
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub status: String,
    pub phone_number: String,
    pub amount: u64,
    pub customer_message: Option<String>,
}

/// Public view of a payment row, polled by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentView {
    pub payment_id: String,
    pub order_id: Option<String>,
    pub status: String,
    pub amount: f64,
    pub result_code: Option<i64>,
    pub result_desc: Option<String>,
    pub mpesa_receipt_number: Option<String>,
}

impl From<MpesaPayment> for PaymentView {
    fn from(p: MpesaPayment) -> Self {
        Self {
            payment_id: p.id,
            order_id: p.order_id,
            status: p.status,
            amount: p.amount,
            result_code: p.result_code,
            result_desc: p.result_desc,
            mpesa_receipt_number: p.mpesa_receipt_number,
        }
    }
}

/// What a callback did to local state.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// A pending payment settled.
    Applied {
        payment_id: String,
        status: PaymentStatus,
        order_confirmed: bool,
    },
    /// Arrived while a push was still awaiting its ack; applied once the
    /// checkout id is attached.
    Deferred { checkout_request_id: String },
    /// Unknown checkout id or a replay for an already settled payment.
    Ignored { checkout_request_id: String },
}

/// Callbacks that beat their push ack, held while any push is in flight.
#[derive(Default)]
struct EarlyCallbacks {
    pushes_in_flight: usize,
    held: HashMap<String, PaymentResult>,
}

impl EarlyCallbacks {
    fn finish_push(&mut self) {
        self.pushes_in_flight = self.pushes_in_flight.saturating_sub(1);
        if self.pushes_in_flight == 0 {
            self.held.clear();
        }
    }
}

/// Coordinates the payment gateway with the payment tables.
#[derive(Clone)]
pub struct PaymentService {
    storage: Arc<dyn StorageAdapter>,
    gateway: Arc<dyn PaymentAdapter>,
    early: Arc<Mutex<EarlyCallbacks>>,
}

impl PaymentService {
    pub fn new(storage: Arc<dyn StorageAdapter>, gateway: Arc<dyn PaymentAdapter>) -> Self {
        Self {
            storage,
            gateway,
            early: Arc::new(Mutex::new(EarlyCallbacks::default())),
        }
    }

    /// Records a pending payment and prompts the customer's phone.
    ///
    /// A rejected push marks the row failed before the error is returned.
    pub async fn initiate(
        &self,
        phone: &str,
        amount: f64,
        order_id: Option<&str>,
    ) -> Result<InitiatedPayment, StoreError> {
        let phone_number = autospares_mpesa::parse_phone(phone)?;
        let amount = whole_shillings(amount)?;

        let order_id = order_id.map(str::trim).filter(|id| !id.is_empty());
        if let Some(id) = order_id
            && self.storage.get_order(id).await?.is_none()
        {
            return Err(StoreError::not_found("order", id));
        }

        let now = chrono::Utc::now().to_rfc3339();
        let payment = MpesaPayment {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.map(str::to_string),
            phone_number: phone_number.clone(),
            amount: amount as f64,
            status: PaymentStatus::Pending.to_string(),
            checkout_request_id: None,
            merchant_request_id: None,
            result_code: None,
            result_desc: None,
            mpesa_receipt_number: None,
            transaction_date: None,
            created_at: now.clone(),
            updated_at: now,
        };
        self.storage.create_mpesa_payment(&payment).await?;

        let reference = match order_id {
            Some(id) => id.to_string(),
            None => format!("ORDER-{}", chrono::Utc::now().timestamp_millis()),
        };
        let request = StkPushRequest {
            phone_number: phone_number.clone(),
            amount,
            description: format!("AutoSpares Payment - {reference}"),
            account_reference: reference,
        };

        self.early.lock().await.pushes_in_flight += 1;
        let ack = match self.gateway.initiate_stk_push(request).await {
            Ok(ack) => ack,
            Err(e) => {
                self.early.lock().await.finish_push();
                warn!(payment_id = %payment.id, error = %e, "stk push failed");
                if let Err(mark) = self
                    .storage
                    .fail_mpesa_payment(&payment.id, &e.to_string())
                    .await
                {
                    warn!(payment_id = %payment.id, error = %mark, "could not mark payment failed");
                }
                return Err(e);
            }
        };

        let held = {
            let mut early = self.early.lock().await;
            let attached = self
                .storage
                .attach_checkout_ids(&payment.id, &ack.checkout_request_id, &ack.merchant_request_id)
                .await;
            let held = early.held.remove(&ack.checkout_request_id);
            early.finish_push();
            attached?;
            held
        };

        info!(
            payment_id = %payment.id,
            checkout_request_id = %ack.checkout_request_id,
            amount = %format_ksh(amount as f64),
            "stk push sent"
        );

        if let Some(result) = held {
            let outcome = self.apply(result).await?;
            info!(payment_id = %payment.id, ?outcome, "applied callback received before ack");
        }

        Ok(InitiatedPayment {
            payment_id: payment.id,
            checkout_request_id: ack.checkout_request_id,
            merchant_request_id: ack.merchant_request_id,
            status: "initiated".into(),
            phone_number,
            amount,
            customer_message: ack.customer_message,
        })
    }

    /// Applies a raw provider callback.
    ///
    /// Only a payload without `Body.stkCallback` is an error; everything else
    /// is recorded and acknowledged by the caller. A callback for a checkout
    /// id no row carries yet is held while a push is in flight.
    pub async fn handle_callback(&self, raw: &str) -> Result<CallbackOutcome, StoreError> {
        let result = autospares_mpesa::parse_callback(raw)?;
        let mut early = self.early.lock().await;
        if early.pushes_in_flight > 0
            && self
                .storage
                .get_mpesa_payment_by_checkout(&result.checkout_request_id)
                .await?
                .is_none()
        {
            info!(
                checkout_request_id = %result.checkout_request_id,
                "callback arrived before its push ack, holding"
            );
            let checkout_request_id = result.checkout_request_id.clone();
            early.held.insert(checkout_request_id.clone(), result);
            return Ok(CallbackOutcome::Deferred {
                checkout_request_id,
            });
        }
        drop(early);
        self.apply(result).await
    }

    async fn apply(&self, result: PaymentResult) -> Result<CallbackOutcome, StoreError> {
        let Some(settled) = self.storage.settle_payment(&result).await? else {
            info!(
                checkout_request_id = %result.checkout_request_id,
                "callback for unknown or settled payment ignored"
            );
            return Ok(CallbackOutcome::Ignored {
                checkout_request_id: result.checkout_request_id,
            });
        };

        let status = result.status();
        info!(
            payment_id = %settled.payment.id,
            status = %status,
            result_code = result.result_code,
            order_confirmed = settled.order_confirmed,
            "payment settled"
        );
        Ok(CallbackOutcome::Applied {
            payment_id: settled.payment.id,
            status,
            order_confirmed: settled.order_confirmed,
        })
    }

    pub async fn status(&self, payment_id: &str) -> Result<PaymentView, StoreError> {
        self.storage
            .get_mpesa_payment(payment_id)
            .await?
            .map(PaymentView::from)
            .ok_or_else(|| StoreError::not_found("payment", payment_id))
    }
}

/// Rounds to whole shillings; the provider rejects fractional or zero amounts.
fn whole_shillings(amount: f64) -> Result<u64, StoreError> {
    if !amount.is_finite() || amount.round() < 1.0 {
        return Err(StoreError::Validation(
            "amount must be at least KSh 1".into(),
        ));
    }
    Ok(amount.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{OrderService, tests::customer};
    use autospares_config::model::CheckoutConfig;
    use async_trait::async_trait;
    use autospares_core::types::{AdapterType, HealthStatus, OrderLine, StkPushAck};
    use autospares_core::PluginAdapter;
    use autospares_test_utils::mock_payment::MockPaymentGateway;
    use autospares_test_utils::storage::temp_storage;
    use tokio::sync::Notify;

    /// Holds each push until released, so a callback can land before the ack.
    struct GatedGateway {
        inner: MockPaymentGateway,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl PluginAdapter for GatedGateway {
        fn name(&self) -> &str {
            "gated-mpesa"
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
    impl PaymentAdapter for GatedGateway {
        async fn initiate_stk_push(
            &self,
            request: StkPushRequest,
        ) -> Result<StkPushAck, StoreError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.initiate_stk_push(request).await
        }
    }

    fn callback(checkout_id: &str, code: i64) -> String {
        let metadata = if code == 0 {
            r#","CallbackMetadata":{"Item":[
                {"Name":"Amount","Value":1500},
                {"Name":"MpesaReceiptNumber","Value":"QKT1ABC2DE"},
                {"Name":"TransactionDate","Value":20261018143015},
                {"Name":"PhoneNumber","Value":254712345678}]}"#
        } else {
            ""
        };
        format!(
            r#"{{"Body":{{"stkCallback":{{"MerchantRequestID":"m-1","CheckoutRequestID":"{checkout_id}","ResultCode":{code},"ResultDesc":"done"{metadata}}}}}}}"#
        )
    }

    async fn order_id(storage: Arc<dyn StorageAdapter>) -> String {
        OrderService::new(storage, CheckoutConfig::default())
            .place_order(
                customer(),
                vec![OrderLine {
                    product_id: "p1".into(),
                    product_name: "Spark Plug".into(),
                    product_sku: None,
                    quantity: 1,
                    unit_price: 1000.0,
                }],
                None,
            )
            .await
            .unwrap()
            .order_id
    }

    #[test]
    fn amounts_round_to_shillings() {
        assert_eq!(whole_shillings(1499.6).unwrap(), 1500);
        assert!(whole_shillings(0.4).is_err());
        assert!(whole_shillings(-5.0).is_err());
        assert!(whole_shillings(f64::INFINITY).is_err());
    }

    #[tokio::test]
    async fn initiate_sends_normalized_request() {
        let (storage, _dir) = temp_storage().await;
        let gateway = Arc::new(MockPaymentGateway::new());
        let service = PaymentService::new(storage.clone(), gateway.clone());

        let initiated = service.initiate("0712 345 678", 1500.0, None).await.unwrap();
        assert_eq!(initiated.phone_number, "254712345678");
        assert_eq!(initiated.status, "initiated");

        let sent = gateway.requests().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].amount, 1500);
        assert!(sent[0].account_reference.starts_with("ORDER-"));
        assert_eq!(
            sent[0].description,
            format!("AutoSpares Payment - {}", sent[0].account_reference)
        );

        let row = storage
            .get_mpesa_payment(&initiated.payment_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, "pending");
        assert_eq!(
            row.checkout_request_id.as_deref(),
            Some(initiated.checkout_request_id.as_str())
        );
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_gateway() {
        let (storage, _dir) = temp_storage().await;
        let gateway = Arc::new(MockPaymentGateway::new());
        let service = PaymentService::new(storage, gateway.clone());

        assert!(matches!(
            service.initiate("12345", 100.0, None).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            service.initiate("0712345678", 0.0, None).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            service.initiate("0712345678", 10.0, Some("missing-order")).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(gateway.requests().await.is_empty());
    }

    #[tokio::test]
    async fn rejected_push_marks_payment_failed() {
        let (storage, _dir) = temp_storage().await;
        let gateway = Arc::new(MockPaymentGateway::failing("insufficient balance"));
        let service = PaymentService::new(storage.clone(), gateway);

        let err = service.initiate("0712345678", 10.0, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Payment { .. }));
    }

    #[tokio::test]
    async fn successful_callback_confirms_order_once() {
        let (storage, _dir) = temp_storage().await;
        let order_id = order_id(storage.clone()).await;
        let service =
            PaymentService::new(storage.clone(), Arc::new(MockPaymentGateway::new()));

        let initiated = service
            .initiate("254712345678", 1500.0, Some(&order_id))
            .await
            .unwrap();
        let body = callback(&initiated.checkout_request_id, 0);

        let outcome = service.handle_callback(&body).await.unwrap();
        assert_eq!(
            outcome,
            CallbackOutcome::Applied {
                payment_id: initiated.payment_id.clone(),
                status: PaymentStatus::Completed,
                order_confirmed: true,
            }
        );
        let order = storage.get_order(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, "confirmed");

        let view = service.status(&initiated.payment_id).await.unwrap();
        assert_eq!(view.status, "completed");
        assert_eq!(view.mpesa_receipt_number.as_deref(), Some("QKT1ABC2DE"));

        // A replayed failure must not flip the settled payment.
        let replay = service
            .handle_callback(&callback(&initiated.checkout_request_id, 1032))
            .await
            .unwrap();
        assert!(matches!(replay, CallbackOutcome::Ignored { .. }));
        assert_eq!(
            service.status(&initiated.payment_id).await.unwrap().status,
            "completed"
        );
    }

    #[tokio::test]
    async fn failed_callback_leaves_order_pending() {
        let (storage, _dir) = temp_storage().await;
        let order_id = order_id(storage.clone()).await;
        let service =
            PaymentService::new(storage.clone(), Arc::new(MockPaymentGateway::new()));
        let initiated = service
            .initiate("0712345678", 1500.0, Some(&order_id))
            .await
            .unwrap();

        let outcome = service
            .handle_callback(&callback(&initiated.checkout_request_id, 1032))
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            CallbackOutcome::Applied { status: PaymentStatus::Failed, order_confirmed: false, .. }
        ));
        let order = storage.get_order(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, "pending");
    }

    #[tokio::test]
    async fn malformed_callback_is_rejected_and_unknown_ignored() {
        let (storage, _dir) = temp_storage().await;
        let service = PaymentService::new(storage, Arc::new(MockPaymentGateway::new()));
        assert!(matches!(
            service.handle_callback(r#"{"nope":1}"#).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            service.handle_callback(&callback("ws_CO_unknown", 0)).await.unwrap(),
            CallbackOutcome::Ignored { .. }
        ));
        assert!(matches!(
            service.status("nope").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn callback_before_push_ack_is_applied_after_attach() {
        let (storage, _dir) = temp_storage().await;
        let order_id = order_id(storage.clone()).await;
        let gateway = Arc::new(GatedGateway {
            inner: MockPaymentGateway::new(),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let service = PaymentService::new(storage.clone(), gateway.clone());

        let pushing = {
            let service = service.clone();
            let order_id = order_id.clone();
            tokio::spawn(async move {
                service
                    .initiate("0712345678", 1500.0, Some(&order_id))
                    .await
            })
        };
        gateway.entered.notified().await;

        let early = service
            .handle_callback(&callback("ws_CO_mock_1", 0))
            .await
            .unwrap();
        assert_eq!(
            early,
            CallbackOutcome::Deferred {
                checkout_request_id: "ws_CO_mock_1".into()
            }
        );

        gateway.release.notify_one();
        let initiated = pushing.await.unwrap().unwrap();
        assert_eq!(initiated.checkout_request_id, "ws_CO_mock_1");

        let view = service.status(&initiated.payment_id).await.unwrap();
        assert_eq!(view.status, "completed");
        let order = storage.get_order(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, "confirmed");
    }

    #[tokio::test]
    async fn unknown_callback_is_not_held_without_a_push_in_flight() {
        let (storage, _dir) = temp_storage().await;
        let service = PaymentService::new(storage, Arc::new(MockPaymentGateway::new()));
        service.initiate("0712345678", 10.0, None).await.unwrap();
        assert!(matches!(
            service.handle_callback(&callback("ws_CO_other", 0)).await.unwrap(),
            CallbackOutcome::Ignored { .. }
        ));
        assert!(service.early.lock().await.held.is_empty());
    }
}
