// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! M-Pesa Daraja integration for the AutoSpares backend.
//!
//! [`MpesaGateway`] implements [`PaymentAdapter`] with Lipa Na M-Pesa Online
//! (STK push). Callback bodies are parsed with [`callback::parse_callback`].

pub mod callback;
pub mod client;
pub mod phone;
pub mod stk;

use std::time::Duration;

use async_trait::async_trait;
use autospares_config::model::MpesaConfig;
use autospares_core::types::{StkPushAck, StkPushRequest};
use autospares_core::{AdapterType, HealthStatus, PaymentAdapter, PluginAdapter, StoreError};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

pub use callback::{CallbackAck, parse_callback};
pub use client::DarajaClient;
pub use phone::{is_valid_msisdn, normalize_phone, parse_phone};

/// Public passkey of the Daraja sandbox shortcode 174379.
pub const SANDBOX_PASSKEY: &str =
    "bfb279f9aa9bdbcf158e97dd71a467cd2e0c893059b10f78e6b72ada1ed2c919";

/// Daraja-backed payment adapter.
pub struct MpesaGateway {
    client: DarajaClient,
    shortcode: String,
    passkey: SecretString,
    callback_url: String,
}

impl MpesaGateway {
    /// Builds the gateway from the `[mpesa]` section.
    ///
    /// `default_callback_url` is used when `mpesa.callback_url` is unset.
    /// Missing credentials are reported when the first token is requested.
    pub fn new(config: &MpesaConfig, default_callback_url: String) -> Result<Self, StoreError> {
        let base_url = config.base_url.clone().unwrap_or_else(|| {
            if config.environment == "production" {
                client::PRODUCTION_BASE_URL.to_string()
            } else {
                client::SANDBOX_BASE_URL.to_string()
            }
        });

        let consumer_key = resolve_secret(&config.consumer_key, "MPESA_CONSUMER_KEY");
        let consumer_secret = resolve_secret(&config.consumer_secret, "MPESA_CONSUMER_SECRET");
        let passkey = match (&config.passkey, config.environment.as_str()) {
            (Some(key), _) if !key.is_empty() => SecretString::from(key.clone()),
            (_, "production") => {
                return Err(StoreError::Config(
                    "mpesa.passkey is required in production".into(),
                ));
            }
            _ => SecretString::from(SANDBOX_PASSKEY),
        };

        let client = DarajaClient::new(
            base_url,
            consumer_key,
            consumer_secret,
            Duration::from_secs(config.timeout_secs),
        )?;
        let callback_url = config.callback_url.clone().unwrap_or(default_callback_url);

        info!(
            environment = %config.environment,
            shortcode = %config.shortcode,
            base_url = %client.base_url(),
            "M-Pesa gateway initialized"
        );

        Ok(Self {
            client,
            shortcode: config.shortcode.clone(),
            passkey,
            callback_url,
        })
    }

    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    fn build_payload(&self, request: &StkPushRequest, timestamp: String) -> stk::StkPushPayload {
        stk::StkPushPayload {
            business_short_code: self.shortcode.clone(),
            password: stk::password(&self.shortcode, self.passkey.expose_secret(), &timestamp),
            timestamp,
            transaction_type: stk::TRANSACTION_TYPE.to_string(),
            amount: request.amount,
            party_a: request.phone_number.clone(),
            party_b: self.shortcode.clone(),
            phone_number: request.phone_number.clone(),
            call_back_url: self.callback_url.clone(),
            account_reference: request.account_reference.clone(),
            transaction_desc: request.description.clone(),
        }
    }
}

fn resolve_secret(configured: &Option<String>, env_var: &str) -> SecretString {
    match configured {
        Some(value) if !value.is_empty() => SecretString::from(value.clone()),
        _ => SecretString::from(std::env::var(env_var).unwrap_or_default()),
    }
}

#[async_trait]
impl PluginAdapter for MpesaGateway {
    fn name(&self) -> &str {
        "mpesa"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Payment
    }

    async fn health_check(&self) -> Result<HealthStatus, StoreError> {
        match self.client.access_token().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Degraded(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("M-Pesa gateway shutting down");
        Ok(())
    }
}

#[async_trait]
impl PaymentAdapter for MpesaGateway {
    async fn initiate_stk_push(&self, request: StkPushRequest) -> Result<StkPushAck, StoreError> {
        if !is_valid_msisdn(&request.phone_number) {
            return Err(StoreError::Validation(format!(
                "phone number `{}` is not normalized",
                request.phone_number
            )));
        }
        if request.amount == 0 {
            return Err(StoreError::Validation("amount must be at least KSh 1".into()));
        }

        let payload = self.build_payload(&request, stk::timestamp(chrono::Utc::now()));
        let response = self.client.stk_push(&payload).await?;
        info!(
            checkout_request_id = %response.checkout_request_id,
            account_reference = %request.account_reference,
            amount = request.amount,
            "STK push accepted"
        );

        Ok(StkPushAck {
            merchant_request_id: response.merchant_request_id,
            checkout_request_id: response.checkout_request_id,
            response_code: response.response_code,
            response_description: response.response_description,
            customer_message: response.customer_message,
        })
    }
}
