// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use autospares_agent::APOLOGY;
use autospares_core::{MailAdapter, StorageAdapter};
use autospares_gateway::{AppState, SESSION_HEADER, router};
use autospares_test_utils::TestHarness;
use autospares_test_utils::storage::sample_product;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app(harness: &TestHarness, with_mailer: bool) -> Router {
    let mailer = with_mailer.then(|| harness.mock_mailer.clone() as Arc<dyn MailAdapter>);
    router(AppState::new(
        harness.engine.clone(),
        harness.services.clone(),
        mailer,
        Duration::from_secs(5),
    ))
}

async fn harness() -> TestHarness {
    TestHarness::builder()
        .with_products(vec![
            sample_product("p1", "Brake Pads", 3000.0),
            sample_product("p2", "Oil Filter", 800.0),
        ])
        .build()
        .await
        .unwrap()
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(SESSION_HEADER, token);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn new_session(app: &Router) -> String {
    let (status, body) = call(app, Method::POST, "/v1/sessions", None, None).await;
    assert_eq!(status, StatusCode::OK);
    body["session_token"].as_str().unwrap().to_string()
}

fn cart_body(lines: &[(&str, &str, f64, u32)]) -> Value {
    json!({
        "items": lines
            .iter()
            .map(|(id, name, price, qty)| json!({
                "product_id": id,
                "product_name": name,
                "unit_price": price,
                "quantity": qty,
            }))
            .collect::<Vec<_>>()
    })
}

fn customer() -> Value {
    json!({
        "first_name": "Otieno",
        "last_name": "Odhiambo",
        "email": "otieno@example.co.ke",
        "phone": "0722000111",
        "city": "Kisumu"
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let harness = harness().await;
    let app = app(&harness, false);
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn session_bootstrap_mints_a_token() {
    let harness = harness().await;
    let app = app(&harness, false);
    let (status, body) = call(
        &app,
        Method::POST,
        "/v1/sessions",
        None,
        Some(json!({"email": "buyer@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["session_token"].as_str().unwrap();
    assert!(token.starts_with("session_"));

    let session = harness
        .storage
        .get_session_by_token(token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.id, body["session_id"].as_str().unwrap());
    assert_eq!(session.title.as_deref(), Some("Welcome Chat"));
    assert_eq!(session.email.as_deref(), Some("buyer@example.com"));
}

#[tokio::test]
async fn cart_routes_require_a_known_token() {
    let harness = harness().await;
    let app = app(&harness, false);

    let (status, body) = call(&app, Method::GET, "/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().contains(SESSION_HEADER));

    let (status, _) = call(&app, Method::GET, "/v1/cart", Some("session_nope"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn put_cart_replaces_and_get_reads_back() {
    let harness = harness().await;
    let app = app(&harness, false);
    let token = new_session(&app).await;

    let (status, body) = call(
        &app,
        Method::PUT,
        "/v1/cart",
        Some(&token),
        Some(cart_body(&[("p1", "Brake Pads", 3000.0, 2), ("p2", "Oil Filter", 800.0, 1)])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 3);
    assert_eq!(body["total_value"], 6800.0);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/v1/cart",
        Some(&token),
        Some(cart_body(&[("p2", "Oil Filter", 800.0, 4)])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, Method::GET, "/v1/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_items"], 4);
    assert_eq!(body["formatted_total"], "KSh 3,200");
    assert_eq!(body["has_items"], true);
}

#[tokio::test]
async fn put_cart_rejects_zero_quantity() {
    let harness = harness().await;
    let app = app(&harness, false);
    let token = new_session(&app).await;
    let (status, body) = call(
        &app,
        Method::PUT,
        "/v1/cart",
        Some(&token),
        Some(cart_body(&[("p1", "Brake Pads", 3000.0, 0)])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn chat_round_trip_returns_session() {
    let harness = harness().await;
    harness.add_provider_response("We stock brake pads for the Fielder.").await;
    let app = app(&harness, false);

    let (status, body) = call(
        &app,
        Method::POST,
        "/v1/chat",
        None,
        Some(json!({"message": "Do you have brake pads?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "We stock brake pads for the Fielder.");
    assert!(body["session_token"].as_str().unwrap().starts_with("session_"));
    assert!(body["tool_results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn chat_validation_and_provider_failures() {
    let harness = harness().await;
    let app = app(&harness, false);

    let (status, _) = call(&app, Method::POST, "/v1/chat", None, Some(json!({"message": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    harness.mock_provider.push_error("quota exceeded").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/v1/chat",
        None,
        Some(json!({"message": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["response"], APOLOGY);
    assert!(body["error"].as_str().unwrap().contains("quota exceeded"));
}

#[tokio::test]
async fn orders_use_the_session_cart() {
    let harness = harness().await;
    let app = app(&harness, false);
    let token = new_session(&app).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/v1/orders",
        Some(&token),
        Some(json!({"customer": customer()})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cart is empty"));

    call(
        &app,
        Method::PUT,
        "/v1/cart",
        Some(&token),
        Some(cart_body(&[("p1", "Brake Pads", 3000.0, 2)])),
    )
    .await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/v1/orders",
        Some(&token),
        Some(json!({"customer": customer(), "notes": "Call on arrival"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["order_number"].as_str().unwrap().starts_with("ORD-"));
    assert_eq!(body["status"], "pending");
    assert_eq!(body["totals"]["subtotal"], 6000.0);
    assert_eq!(body["totals"]["shipping"], 0.0);
    assert_eq!(body["totals"]["tax"], 960.0);
    assert_eq!(body["totals"]["total"], 6960.0);
}

#[tokio::test]
async fn stk_push_requires_phone_and_amount() {
    let harness = harness().await;
    let app = app(&harness, false);
    let (status, body) = call(
        &app,
        Method::POST,
        "/v1/mpesa/stk-push",
        None,
        Some(json!({"phone_number": "0712345678"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Phone number and amount are required");

    let (status, _) = call(
        &app,
        Method::POST,
        "/v1/mpesa/stk-push",
        None,
        Some(json!({"phone_number": "12345", "amount": 100})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(harness.mock_gateway.requests().await.is_empty());
}

#[tokio::test]
async fn payment_flow_confirms_the_order() {
    let harness = harness().await;
    let app = app(&harness, false);
    let token = new_session(&app).await;
    call(
        &app,
        Method::PUT,
        "/v1/cart",
        Some(&token),
        Some(cart_body(&[("p2", "Oil Filter", 800.0, 1)])),
    )
    .await;
    let (_, order) = call(
        &app,
        Method::POST,
        "/v1/orders",
        Some(&token),
        Some(json!({"customer": customer()})),
    )
    .await;
    let order_id = order["order_id"].as_str().unwrap().to_string();

    let (status, push) = call(
        &app,
        Method::POST,
        "/v1/mpesa/stk-push",
        None,
        Some(json!({"phone_number": "0712345678", "amount": 1428, "order_id": order_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(push["success"], true);
    assert_eq!(push["checkout_request_id"], "ws_CO_mock_1");
    let payment_id = push["payment_id"].as_str().unwrap().to_string();

    let (status, view) = call(
        &app,
        Method::GET,
        &format!("/v1/payments/{payment_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "pending");

    let callback = json!({"Body": {"stkCallback": {
        "MerchantRequestID": "mock-merchant-1",
        "CheckoutRequestID": "ws_CO_mock_1",
        "ResultCode": 0,
        "ResultDesc": "The service request is processed successfully.",
        "CallbackMetadata": {"Item": [
            {"Name": "Amount", "Value": 1428},
            {"Name": "MpesaReceiptNumber", "Value": "QKT9XYZ123"},
            {"Name": "TransactionDate", "Value": 20261018120000u64},
            {"Name": "PhoneNumber", "Value": 254712345678u64}
        ]}
    }}});
    let (status, ack) = call(&app, Method::POST, "/v1/mpesa/callback", None, Some(callback)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"ResultCode": 0, "ResultDesc": "Accepted"}));

    let (_, view) = call(
        &app,
        Method::GET,
        &format!("/v1/payments/{payment_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(view["status"], "completed");
    assert_eq!(view["mpesa_receipt_number"], "QKT9XYZ123");

    let order = harness.storage.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, "confirmed");
}

#[tokio::test]
async fn callbacks_are_acknowledged_unless_malformed() {
    let harness = harness().await;
    let app = app(&harness, false);

    let (status, _) = call(
        &app,
        Method::POST,
        "/v1/mpesa/callback",
        None,
        Some(json!({"Body": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = json!({"Body": {"stkCallback": {
        "MerchantRequestID": "m",
        "CheckoutRequestID": "ws_CO_unknown",
        "ResultCode": 1032,
        "ResultDesc": "Request cancelled by user"
    }}});
    let (status, ack) = call(&app, Method::POST, "/v1/mpesa/callback", None, Some(unknown)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["ResultCode"], 0);
}

#[tokio::test]
async fn unknown_payment_is_not_found() {
    let harness = harness().await;
    let app = app(&harness, false);
    let (status, body) = call(&app, Method::GET, "/v1/payments/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "payment not found: missing");
}

#[tokio::test]
async fn invoices_need_a_mailer() {
    let harness = harness().await;
    let invoice = json!({
        "to": "otieno@example.co.ke",
        "order_number": "ORD-1760788800000",
        "customer_name": "Otieno Odhiambo",
        "order_total": 6960.0,
        "order_items": [{"name": "Brake Pads", "quantity": 2, "price": 3000.0}]
    });

    let disabled = app(&harness, false);
    let (status, _) = call(
        &disabled,
        Method::POST,
        "/v1/invoices/send",
        None,
        Some(invoice.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let enabled = app(&harness, true);
    let (status, body) = call(&enabled, Method::POST, "/v1/invoices/send", None, Some(invoice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["message_id"].as_str().unwrap().starts_with("<mock-"));

    let sent = harness.mock_mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].order_number, "ORD-1760788800000");
}
