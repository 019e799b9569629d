// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the storefront API.

use std::time::Duration;

use autospares_core::StoreError;
use autospares_core::types::{CartLine, CartSummary};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Header carrying the session token on cart routes.
pub const SESSION_HEADER: &str = "x-session-token";

/// Session id and token issued by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPair {
    pub session_id: String,
    pub session_token: String,
}

/// Body of POST /v1/chat.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatMessage {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_initial_load: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_items: Option<Vec<CartLine>>,
}

/// Reply from POST /v1/chat.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatAnswer {
    pub response: String,
    #[serde(default)]
    pub tool_results: Vec<serde_json::Value>,
    pub session_id: String,
    pub session_token: String,
}

impl ChatAnswer {
    pub fn session(&self) -> SessionPair {
        SessionPair {
            session_id: self.session_id.clone(),
            session_token: self.session_token.clone(),
        }
    }
}

/// Reply from POST /v1/mpesa/stk-push.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StkPushStarted {
    pub payment_id: String,
    pub checkout_request_id: String,
    #[serde(default)]
    pub customer_message: Option<String>,
}

/// Reply from GET /v1/payments/{id}.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentStatusView {
    pub status: String,
    #[serde(default)]
    pub result_code: Option<i64>,
    #[serde(default)]
    pub result_desc: Option<String>,
    #[serde(default)]
    pub mpesa_receipt_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct CartBody<'a> {
    items: &'a [CartLine],
}

/// Storefront API client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `ws://` / `wss://` URL of the cart socket for `token`.
    ///
    /// The token is form-encoded into the query string.
    pub fn cart_socket_url(&self, token: &str) -> Result<String, StoreError> {
        let invalid =
            |e: String| StoreError::Config(format!("invalid server URL {}: {e}", self.base_url));
        let mut url = reqwest::Url::parse(&format!("{}/ws", self.base_url))
            .map_err(|e| invalid(e.to_string()))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => other,
        }
        .to_string();
        url.set_scheme(&scheme)
            .map_err(|()| invalid(format!("cannot use scheme {scheme}")))?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.into())
    }

    /// POST /v1/sessions
    pub async fn create_session(&self) -> Result<SessionPair, StoreError> {
        let request = self.http.post(self.url("/v1/sessions"));
        self.send(request).await
    }

    /// POST /v1/chat
    pub async fn chat(&self, message: &ChatMessage) -> Result<ChatAnswer, StoreError> {
        let request = self.http.post(self.url("/v1/chat")).json(message);
        self.send(request).await
    }

    /// GET /v1/cart
    pub async fn get_cart(&self, token: &str) -> Result<CartSummary, StoreError> {
        let request = self
            .http
            .get(self.url("/v1/cart"))
            .header(SESSION_HEADER, token);
        self.send(request).await
    }

    /// PUT /v1/cart
    pub async fn put_cart(&self, token: &str, lines: &[CartLine]) -> Result<CartSummary, StoreError> {
        let request = self
            .http
            .put(self.url("/v1/cart"))
            .header(SESSION_HEADER, token)
            .json(&CartBody { items: lines });
        self.send(request).await
    }

    /// POST /v1/mpesa/stk-push
    pub async fn start_payment(
        &self,
        phone_number: &str,
        amount: f64,
        order_id: Option<&str>,
    ) -> Result<StkPushStarted, StoreError> {
        let body = serde_json::json!({
            "phone_number": phone_number,
            "amount": amount,
            "order_id": order_id,
        });
        let request = self.http.post(self.url("/v1/mpesa/stk-push")).json(&body);
        self.send(request).await
    }

    /// GET /v1/payments/{id}
    pub async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatusView, StoreError> {
        let request = self
            .http
            .get(self.url(&format!("/v1/payments/{payment_id}")));
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = request.send().await.map_err(|e| StoreError::Transport {
            message: format!("request failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| StoreError::Transport {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(status = status.as_u16(), "storefront API response");

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|e| StoreError::Transport {
                message: format!("unexpected response body: {e}"),
                source: Some(Box::new(e)),
            });
        }
        Err(classify(status, &body))
    }
}

/// Map an error status to a [`StoreError`]. Only [`StoreError::Transport`] is
/// worth retrying.
fn classify(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string());
    match status {
        StatusCode::BAD_REQUEST => StoreError::Validation(message),
        StatusCode::NOT_FOUND => StoreError::NotFound {
            entity: "resource",
            id: message,
        },
        StatusCode::UNAUTHORIZED => StoreError::Validation(format!("unauthorized: {message}")),
        _ => StoreError::Transport {
            message: format!("HTTP {}: {message}", status.as_u16()),
            source: None,
        },
    }
}
