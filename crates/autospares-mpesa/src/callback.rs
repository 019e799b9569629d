// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of the STK result callback Safaricom posts to `CallBackURL`.

use autospares_core::StoreError;
use autospares_core::types::PaymentResult;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct CallbackEnvelope {
    #[serde(rename = "Body")]
    body: Option<CallbackBody>,
}

#[derive(Debug, Deserialize)]
struct CallbackBody {
    #[serde(rename = "stkCallback")]
    stk_callback: Option<StkCallback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: String,
    result_code: i64,
    #[serde(default)]
    result_desc: String,
    #[serde(default)]
    callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Deserialize)]
struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    item: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
struct MetadataItem {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value", default)]
    value: Option<serde_json::Value>,
}

/// Acknowledgement returned for every well-formed callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    pub fn accepted() -> Self {
        Self {
            result_code: 0,
            result_desc: "Accepted".to_string(),
        }
    }
}

/// Parses a raw callback body.
///
/// A body without `Body.stkCallback` is a [`StoreError::Validation`]; the
/// HTTP layer answers it with 400.
pub fn parse_callback(raw: &str) -> Result<PaymentResult, StoreError> {
    let envelope: CallbackEnvelope = serde_json::from_str(raw)
        .map_err(|e| StoreError::Validation(format!("invalid callback body: {e}")))?;
    let callback = envelope
        .body
        .and_then(|b| b.stk_callback)
        .ok_or_else(|| StoreError::Validation("callback is missing Body.stkCallback".into()))?;

    let mut result = PaymentResult {
        checkout_request_id: callback.checkout_request_id,
        merchant_request_id: callback.merchant_request_id,
        result_code: callback.result_code,
        result_desc: callback.result_desc,
        receipt_number: None,
        transaction_date: None,
        phone_number: None,
        amount: None,
        raw: raw.to_string(),
    };

    for item in callback.callback_metadata.map(|m| m.item).unwrap_or_default() {
        let Some(value) = item.value else { continue };
        match item.name.as_str() {
            "MpesaReceiptNumber" => result.receipt_number = value_to_string(&value),
            "TransactionDate" => {
                result.transaction_date = value_to_string(&value).map(|d| transaction_date(&d))
            }
            "PhoneNumber" => result.phone_number = value_to_string(&value),
            "Amount" => result.amount = value.as_f64(),
            _ => {}
        }
    }

    Ok(result)
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `20260310010507` becomes `2026-03-10T01:05:07`; anything else is kept as sent.
fn transaction_date(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M%S")
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autospares_core::types::PaymentStatus;

    const SUCCESS: &str = r#"{
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": "ws_CO_191220191020363925",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        {"Name": "Amount", "Value": 1.00},
                        {"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"},
                        {"Name": "Balance"},
                        {"Name": "TransactionDate", "Value": 20191219102115},
                        {"Name": "PhoneNumber", "Value": 254708374149}
                    ]
                }
            }
        }
    }"#;

    #[test]
    fn successful_callback_extracts_metadata() {
        let result = parse_callback(SUCCESS).unwrap();
        assert_eq!(result.checkout_request_id, "ws_CO_191220191020363925");
        assert_eq!(result.result_code, 0);
        assert_eq!(result.status(), PaymentStatus::Completed);
        assert_eq!(result.receipt_number.as_deref(), Some("NLJ7RT61SV"));
        assert_eq!(result.transaction_date.as_deref(), Some("2019-12-19T10:21:15"));
        assert_eq!(result.phone_number.as_deref(), Some("254708374149"));
        assert_eq!(result.amount, Some(1.0));
        assert_eq!(result.raw, SUCCESS);
    }

    #[test]
    fn cancelled_callback_has_no_metadata() {
        let body = r#"{"Body":{"stkCallback":{
            "MerchantRequestID":"m","CheckoutRequestID":"ws_CO_2",
            "ResultCode":1032,"ResultDesc":"Request cancelled by user"}}}"#;
        let result = parse_callback(body).unwrap();
        assert_eq!(result.status(), PaymentStatus::Failed);
        assert_eq!(result.result_desc, "Request cancelled by user");
        assert!(result.receipt_number.is_none());
    }

    #[test]
    fn missing_body_is_validation_error() {
        for body in [r#"{}"#, r#"{"Body":{}}"#, "not json"] {
            assert!(matches!(
                parse_callback(body),
                Err(StoreError::Validation(_))
            ));
        }
    }

    #[test]
    fn ack_serializes_in_daraja_shape() {
        let json = serde_json::to_value(CallbackAck::accepted()).unwrap();
        assert_eq!(json, serde_json::json!({"ResultCode": 0, "ResultDesc": "Accepted"}));
    }

    #[test]
    fn unparseable_date_is_kept() {
        assert_eq!(transaction_date("yesterday"), "yesterday");
    }
}
