// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: the chat engine over mock adapters, and the client SDK
//! against a live gateway on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use autospares_client::{
    ApiClient, CartStore, CartSyncer, JsonFilePersistence, PaymentOutcome, PaymentPoller,
    ProductCard, RealtimeCart, SessionCache, SyncOptions,
};
use autospares_core::{MailAdapter, StorageAdapter};
use autospares_core::types::{CartLine, CartSummary};
use autospares_gateway::{AppState, serve};
use autospares_test_utils::TestHarness;
use autospares_test_utils::mock_provider::{function_call, text_response};
use autospares_test_utils::storage::sample_product;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn harness() -> TestHarness {
    TestHarness::builder()
        .with_products(vec![
            sample_product("p1", "Brake Pads", 2500.0),
            sample_product("p2", "Oil Filter", 800.0),
        ])
        .build()
        .await
        .unwrap()
}

async fn start(harness: &TestHarness) -> (SocketAddr, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mailer: Arc<dyn MailAdapter> = harness.mock_mailer.clone();
    let state = AppState::new(
        harness.engine.clone(),
        harness.services.clone(),
        Some(mailer),
        Duration::from_secs(5),
    );
    let cancel = CancellationToken::new();
    tokio::spawn(serve(listener, state, cancel.clone()));
    (addr, cancel)
}

fn card(id: &str, name: &str, price: &str) -> ProductCard {
    ProductCard {
        id: id.into(),
        name: name.into(),
        brand: Some("Bosch".into()),
        price: price.into(),
        price_value: None,
        image_url: None,
    }
}

async fn wait_for<F>(rx: &mut mpsc::Receiver<CartSummary>, mut done: F) -> CartSummary
where
    F: FnMut(&CartSummary) -> bool,
{
    loop {
        let summary = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("cart update within timeout")
            .expect("realtime task alive");
        if done(&summary) {
            return summary;
        }
    }
}

#[tokio::test]
async fn chat_order_uses_the_mirrored_cart() {
    let harness = harness().await;
    harness
        .mock_provider
        .push_response(function_call(
            "create_order",
            json!({
                "items": [],
                "customer_info": {
                    "firstName": "Wanjiru",
                    "lastName": "Kamau",
                    "email": "wanjiru@example.co.ke",
                    "phone": "0712345678",
                    "city": "Nairobi"
                },
                "total_amount": 6300
            }),
        ))
        .await;
    harness
        .mock_provider
        .push_response(text_response("Your order is placed. Total KSh 6,300."))
        .await;

    let cart = vec![CartLine {
        product_id: "p1".into(),
        product_name: "Brake Pads".into(),
        brand: Some("Bosch".into()),
        quantity: 2,
        unit_price: 2500.0,
        image_url: None,
    }];
    let reply = harness
        .engine
        .handle(autospares_agent::ChatRequest {
            message: "Please order what is in my cart".into(),
            cart_items: Some(cart),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(reply.response, "Your order is placed. Total KSh 6,300.");
    assert_eq!(reply.tool_results.len(), 1);
    let result = reply.tool_results[0].result.as_ref().expect("tool succeeded");
    // 5000 subtotal is not above the free-shipping threshold.
    assert_eq!(result["subtotal"], 5000.0);
    assert_eq!(result["shipping_amount"], 500.0);
    assert_eq!(result["tax_amount"], 800.0);
    assert_eq!(result["total_amount"], 6300.0);

    let order_id = result["order_id"].as_str().unwrap();
    let order = harness.storage.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, "pending");
    assert_eq!(harness.storage.get_order_items(order_id).await.unwrap().len(), 1);

    // The follow-up turn reuses the session and sees the same cart.
    harness.add_provider_response("Anything else?").await;
    let next = harness
        .engine
        .handle(autospares_agent::ChatRequest {
            message: "thanks".into(),
            session_token: Some(reply.session_token.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(next.session_id, reply.session_id);
    let summary = harness.services.cart.summary(&reply.session_id).await.unwrap();
    assert_eq!(summary.total_items, 2);
}

#[tokio::test]
async fn provider_failure_does_not_break_the_session() {
    let harness = harness().await;
    harness.mock_provider.push_error("quota exceeded").await;
    assert!(harness.send_message("hello").await.is_err());

    harness.add_provider_response("Karibu! How can I help?").await;
    let reply = harness.send_message("hello again").await.unwrap();
    assert_eq!(reply.response, "Karibu! How can I help?");
}

#[tokio::test]
async fn client_session_is_created_once_and_reused() {
    let harness = harness().await;
    let (addr, cancel) = start(&harness).await;
    let api = ApiClient::new(&format!("http://{addr}")).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let first = SessionCache::open(dir.path()).ensure(&api).await.unwrap();
    // A fresh cache over the same directory stands in for a page reload.
    let mut reopened = SessionCache::open(dir.path());
    let second = reopened.ensure(&api).await.unwrap();
    assert_eq!(first, second);

    let resolved = harness.engine.sessions().lookup(&first.session_token).await.unwrap();
    assert_eq!(resolved.map(|s| s.id), Some(first.session_id.clone()));

    reopened.clear().unwrap();
    let third = reopened.ensure(&api).await.unwrap();
    assert_ne!(third.session_token, first.session_token);
    cancel.cancel();
}

#[tokio::test]
async fn cart_changes_reach_other_tabs() {
    let harness = harness().await;
    let (addr, cancel) = start(&harness).await;
    let api = ApiClient::new(&format!("http://{addr}")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let session = SessionCache::open(dir.path()).ensure(&api).await.unwrap();

    // Second tab listens for pushes.
    let (tx, mut rx) = mpsc::channel(16);
    let listening = CancellationToken::new();
    tokio::spawn(
        RealtimeCart::new(api.clone(), session.session_token.clone()).run(tx, listening.clone()),
    );
    let snapshot = wait_for(&mut rx, |_| true).await;
    assert!(!snapshot.has_items);

    // First tab edits its cart and flushes on exit.
    let mut store = CartStore::load(JsonFilePersistence::new(dir.path()));
    store.add(&card("p1", "Brake Pads", "KSh 2,500"));
    store.add(&card("p2", "Oil Filter", "KSh 800"));
    store.add(&card("p2", "Oil Filter", "KSh 800"));
    let syncer = CartSyncer::spawn(
        api.clone(),
        session.session_token.clone(),
        SyncOptions {
            debounce: Duration::from_secs(60),
            ..SyncOptions::default()
        },
    );
    syncer.schedule(store.lines().to_vec());
    syncer.shutdown().await.unwrap();

    let pushed = wait_for(&mut rx, |s| s.total_items == 3).await;
    assert_eq!(pushed.total_value, 4100.0);
    assert_eq!(pushed.formatted_total, store.summary().formatted_total);

    let server = api.get_cart(&session.session_token).await.unwrap();
    assert_eq!(server.items, store.lines().to_vec());

    // Reloading the first tab restores the same cart.
    let reloaded = CartStore::load(JsonFilePersistence::new(dir.path()));
    assert_eq!(reloaded.lines(), store.lines());

    listening.cancel();
    cancel.cancel();
}

#[tokio::test]
async fn payment_poller_sees_the_callback() {
    let harness = harness().await;
    let (addr, cancel) = start(&harness).await;
    let api = ApiClient::new(&format!("http://{addr}")).unwrap();

    let started = api.start_payment("0712345678", 1500.0, None).await.unwrap();
    assert_eq!(started.checkout_request_id, "ws_CO_mock_1");

    let poller = PaymentPoller {
        initial_delay: Duration::from_millis(10),
        interval: Duration::from_millis(50),
        max_attempts: 100,
    };
    let polling = {
        let api = api.clone();
        let payment_id = started.payment_id.clone();
        tokio::spawn(async move { poller.poll(&api, &payment_id).await })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    let callback = json!({"Body": {"stkCallback": {
        "MerchantRequestID": "mock-merchant-1",
        "CheckoutRequestID": "ws_CO_mock_1",
        "ResultCode": 0,
        "ResultDesc": "The service request is processed successfully.",
        "CallbackMetadata": {"Item": [
            {"Name": "Amount", "Value": 1500},
            {"Name": "MpesaReceiptNumber", "Value": "QKT4ABC987"},
            {"Name": "TransactionDate", "Value": 20261018120000u64},
            {"Name": "PhoneNumber", "Value": 254712345678u64}
        ]}
    }}});
    harness
        .services
        .payments
        .handle_callback(&callback.to_string())
        .await
        .unwrap();

    let outcome = polling.await.unwrap();
    assert_eq!(
        outcome,
        PaymentOutcome::Completed {
            receipt: Some("QKT4ABC987".into())
        }
    );
    assert_eq!(outcome.message(), "Payment successful! Receipt: QKT4ABC987");
    cancel.cancel();
}

#[tokio::test]
async fn cancelled_payment_surfaces_the_reason() {
    let harness = harness().await;
    let (addr, cancel) = start(&harness).await;
    let api = ApiClient::new(&format!("http://{addr}")).unwrap();
    let started = api.start_payment("254712345678", 300.0, None).await.unwrap();

    let callback = json!({"Body": {"stkCallback": {
        "MerchantRequestID": "mock-merchant-1",
        "CheckoutRequestID": started.checkout_request_id,
        "ResultCode": 1032,
        "ResultDesc": "Request cancelled by user"
    }}});
    harness
        .services
        .payments
        .handle_callback(&callback.to_string())
        .await
        .unwrap();

    let poller = PaymentPoller {
        initial_delay: Duration::ZERO,
        interval: Duration::from_millis(10),
        max_attempts: 5,
    };
    let outcome = poller.poll(&api, &started.payment_id).await;
    assert_eq!(
        outcome,
        PaymentOutcome::Failed {
            reason: "Request cancelled by user".into()
        }
    );
    cancel.cancel();
}
