// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lipa Na M-Pesa Online (STK push) wire types and password derivation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Daraja expects timestamps in East Africa Time (UTC+3, no DST).
const EAT_OFFSET_SECS: i32 = 3 * 3600;

pub const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";

/// `YYYYMMDDHHMMSS` in East Africa Time.
pub fn timestamp(now: DateTime<Utc>) -> String {
    let eat = FixedOffset::east_opt(EAT_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    now.with_timezone(&eat).format("%Y%m%d%H%M%S").to_string()
}

/// `base64(shortcode + passkey + timestamp)`.
pub fn password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Body of `POST /mpesa/stkpush/v1/processrequest`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: u64,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub call_back_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

/// Successful STK push response.
#[derive(Debug, Clone, Deserialize)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription")]
    pub response_description: String,
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: Option<String>,
}

/// Error body Daraja returns with 4xx/5xx statuses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DarajaErrorResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    pub error_code: String,
    pub error_message: String,
}

/// OAuth `generate` response. `expires_in` arrives as a string of seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<serde_json::Value>,
}

impl AccessTokenResponse {
    /// Lifetime in seconds, defaulting to Daraja's one hour.
    pub fn expires_in_secs(&self) -> u64 {
        match &self.expires_in {
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(3599),
            Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(3599),
            _ => 3599,
        }
    }
}
