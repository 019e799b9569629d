// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the storefront REST API.

use autospares_agent::session::{SessionRequest, WELCOME_TITLE};
use autospares_agent::{APOLOGY, ChatRequest, PaymentView, PlacedOrder, ResolvedSession};
use autospares_core::{HealthStatus, PluginAdapter, StoreError};
use autospares_core::types::{CartLine, CartSummary, ChatSession, CustomerInfo, Invoice};
use autospares_mpesa::CallbackAck;
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::AppState;

/// Optional body for POST /v1/sessions.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionBootstrap {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Request body for PUT /v1/cart.
#[derive(Debug, Deserialize)]
pub struct CartUpdate {
    pub items: Vec<CartLine>,
}

/// Request body for POST /v1/orders.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub customer: CustomerInfo,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for POST /v1/mpesa/stk-push.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StkPushBody {
    pub phone_number: Option<String>,
    pub amount: Option<f64>,
    pub order_id: Option<String>,
}

/// Response body for POST /v1/mpesa/stk-push.
#[derive(Debug, Serialize, Deserialize)]
pub struct StkPushReply {
    pub success: bool,
    pub payment_id: String,
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub customer_message: Option<String>,
}

/// Response body for POST /v1/invoices/send.
#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceReply {
    pub success: bool,
    pub message_id: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error body for a failed chat request; `response` is shown to the shopper.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatFailure {
    pub error: String,
    pub response: String,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.services.storage.health_check().await {
        Ok(HealthStatus::Healthy) => "ok",
        Ok(other) => {
            tracing::warn!(status = ?other, "storage health degraded");
            "degraded"
        }
        Err(e) => {
            tracing::warn!(error = %e, "storage health check failed");
            "degraded"
        }
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

/// POST /v1/sessions
///
/// Mints a session and token without sending a chat message. The body is
/// optional.
pub async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ResolvedSession>, ApiError> {
    let bootstrap: SessionBootstrap = if body.iter().all(u8::is_ascii_whitespace) {
        SessionBootstrap::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid session body: {e}")))?
    };

    let resolved = state
        .engine
        .sessions()
        .resolve(SessionRequest {
            email: bootstrap.email,
            phone: bootstrap.phone,
            new_title: WELCOME_TITLE.to_string(),
            ..Default::default()
        })
        .await?;
    tracing::info!(session_id = %resolved.session_id, "session bootstrapped");
    Ok(Json(resolved))
}

/// POST /v1/chat
pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let outcome = tokio::time::timeout(state.request_timeout, state.engine.handle(request)).await;
    match outcome {
        Ok(Ok(reply)) => Json(reply).into_response(),
        Ok(Err(StoreError::Validation(message))) => ApiError::bad_request(message).into_response(),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "chat request failed");
            chat_failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(_) => {
            let err = StoreError::Timeout {
                duration: state.request_timeout,
            };
            tracing::error!(error = %err, "chat request timed out");
            chat_failure(StatusCode::GATEWAY_TIMEOUT, err.to_string())
        }
    }
}

fn chat_failure(status: StatusCode, error: String) -> Response {
    (
        status,
        Json(ChatFailure {
            error,
            response: APOLOGY.to_string(),
        }),
    )
        .into_response()
}

/// GET /v1/cart
pub async fn get_cart(
    State(state): State<AppState>,
    Extension(session): Extension<ChatSession>,
) -> Result<Json<CartSummary>, ApiError> {
    Ok(Json(state.services.cart.summary(&session.id).await?))
}

/// PUT /v1/cart
///
/// Replaces the session cart and pushes the new summary to every socket
/// watching it.
pub async fn put_cart(
    State(state): State<AppState>,
    Extension(session): Extension<ChatSession>,
    Json(update): Json<CartUpdate>,
) -> Result<Json<CartSummary>, ApiError> {
    let summary = state.services.cart.sync(&session.id, update.items).await?;
    Ok(Json(summary))
}

/// POST /v1/orders
pub async fn create_order(
    State(state): State<AppState>,
    Extension(session): Extension<ChatSession>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let order = state
        .services
        .orders
        .place_cart_order(&session.id, request.customer, request.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /v1/mpesa/stk-push
pub async fn stk_push(
    State(state): State<AppState>,
    Json(body): Json<StkPushBody>,
) -> Result<Json<StkPushReply>, ApiError> {
    let phone = body
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let (Some(phone), Some(amount)) = (phone, body.amount) else {
        return Err(ApiError::bad_request("Phone number and amount are required"));
    };

    let payment = state
        .services
        .payments
        .initiate(phone, amount, body.order_id.as_deref())
        .await?;
    Ok(Json(StkPushReply {
        success: true,
        payment_id: payment.payment_id,
        checkout_request_id: payment.checkout_request_id,
        merchant_request_id: payment.merchant_request_id,
        customer_message: payment.customer_message,
    }))
}

/// POST /v1/mpesa/callback
///
/// Malformed bodies get a 400. Everything else is acknowledged so Safaricom
/// stops retrying, even when applying the result failed locally.
pub async fn mpesa_callback(State(state): State<AppState>, body: String) -> Response {
    match state.services.payments.handle_callback(&body).await {
        Ok(outcome) => {
            tracing::info!(?outcome, "mpesa callback processed");
        }
        Err(StoreError::Validation(message)) => {
            tracing::warn!(%message, "rejected mpesa callback");
            return ApiError::bad_request(message).into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to apply mpesa callback");
        }
    }
    Json(CallbackAck::accepted()).into_response()
}

/// GET /v1/payments/{id}
pub async fn payment_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentView>, ApiError> {
    Ok(Json(state.services.payments.status(&id).await?))
}

/// POST /v1/invoices/send
pub async fn send_invoice(
    State(state): State<AppState>,
    Json(invoice): Json<Invoice>,
) -> Result<Json<InvoiceReply>, ApiError> {
    let Some(mailer) = state.mailer.as_ref() else {
        return Err(ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "email delivery is not configured",
        ));
    };
    if !invoice.to.contains('@') {
        return Err(ApiError::bad_request("a valid recipient email is required"));
    }

    let message_id = mailer.send_invoice(&invoice).await?;
    tracing::info!(order_number = %invoice.order_number, %message_id, "invoice sent");
    Ok(Json(InvoiceReply {
        success: true,
        message_id,
    }))
}
