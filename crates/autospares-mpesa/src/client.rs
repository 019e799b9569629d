// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Daraja API.
//!
//! [`DarajaClient`] fetches and caches OAuth access tokens and submits STK
//! push requests.

use std::time::{Duration, Instant};

use autospares_core::StoreError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::stk::{AccessTokenResponse, DarajaErrorResponse, StkPushPayload, StkPushResponse};

pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
pub const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

/// Tokens are refreshed this long before Daraja says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct CachedToken {
    value: SecretString,
    expires_at: Instant,
}

/// Daraja API client with a cached OAuth token.
pub struct DarajaClient {
    http: reqwest::Client,
    base_url: String,
    consumer_key: SecretString,
    consumer_secret: SecretString,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for DarajaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DarajaClient")
            .field("base_url", &self.base_url)
            .field("consumer_key", &"[REDACTED]")
            .field("consumer_secret", &"[REDACTED]")
            .finish()
    }
}

impl DarajaClient {
    pub fn new(
        base_url: String,
        consumer_key: SecretString,
        consumer_secret: SecretString,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Payment {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            consumer_key,
            consumer_secret,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns a valid access token, fetching a new one when the cache is
    /// empty or about to expire.
    pub async fn access_token(&self) -> Result<SecretString, StoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.expires_at
        {
            return Ok(token.value.clone());
        }

        let fresh = self.fetch_token().await?;
        let lifetime = Duration::from_secs(fresh.expires_in_secs());
        let value = SecretString::from(fresh.access_token);
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        debug!(lifetime_secs = lifetime.as_secs(), "Daraja access token refreshed");
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn fetch_token(&self) -> Result<AccessTokenResponse, StoreError> {
        let key = self.consumer_key.expose_secret();
        let secret = self.consumer_secret.expose_secret();
        if key.is_empty() || secret.is_empty() {
            return Err(StoreError::Config(
                "M-Pesa consumer key/secret not configured. Set mpesa.consumer_key and mpesa.consumer_secret or MPESA_CONSUMER_KEY / MPESA_CONSUMER_SECRET.".into(),
            ));
        }
        let basic = STANDARD.encode(format!("{key}:{secret}"));

        let response = self
            .http
            .get(format!(
                "{}/oauth/v1/generate?grant_type=client_credentials",
                self.base_url
            ))
            .header("Authorization", format!("Basic {basic}"))
            .send()
            .await
            .map_err(|e| StoreError::Payment {
                message: format!("OAuth request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Payment {
                message: format!("failed to get M-Pesa access token: {status} {body}"),
                source: None,
            });
        }

        response
            .json::<AccessTokenResponse>()
            .await
            .map_err(|e| StoreError::Payment {
                message: format!("invalid OAuth response: {e}"),
                source: Some(Box::new(e)),
            })
    }

    /// Submits an STK push.
    ///
    /// A 401 drops the cached token and retries once with a fresh one. Other
    /// failures are not retried: a repeated push would prompt the customer twice.
    pub async fn stk_push(&self, payload: &StkPushPayload) -> Result<StkPushResponse, StoreError> {
        for attempt in 0..2 {
            let token = self.access_token().await?;
            let response = self
                .http
                .post(format!("{}/mpesa/stkpush/v1/processrequest", self.base_url))
                .bearer_auth(token.expose_secret())
                .json(payload)
                .send()
                .await
                .map_err(|e| StoreError::Payment {
                    message: format!("STK push request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "STK push response received");

            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                warn!("Daraja rejected the access token, refreshing");
                self.invalidate_token().await;
                continue;
            }

            let body = response.text().await.map_err(|e| StoreError::Payment {
                message: format!("failed to read STK push response: {e}"),
                source: Some(Box::new(e)),
            })?;

            if !status.is_success() {
                return Err(StoreError::Payment {
                    message: describe_error(status, &body),
                    source: None,
                });
            }

            let parsed: StkPushResponse =
                serde_json::from_str(&body).map_err(|e| StoreError::Payment {
                    message: format!("invalid STK push response: {e}"),
                    source: Some(Box::new(e)),
                })?;
            if parsed.response_code != "0" {
                return Err(StoreError::Payment {
                    message: format!(
                        "STK push rejected ({}): {}",
                        parsed.response_code, parsed.response_description
                    ),
                    source: None,
                });
            }
            return Ok(parsed);
        }

        Err(StoreError::Payment {
            message: "STK push unauthorized after token refresh".into(),
            source: None,
        })
    }
}

fn describe_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<DarajaErrorResponse>(body) {
        Ok(err) => format!(
            "M-Pesa STK push failed: {status} ({}): {}",
            err.error_code, err.error_message
        ),
        Err(_) => format!("M-Pesa STK push failed: {status} - {body}"),
    }
}
