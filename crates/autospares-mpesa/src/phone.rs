// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kenyan MSISDN normalization for Daraja.

use std::sync::LazyLock;

use autospares_core::StoreError;
use regex::Regex;

static MSISDN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^254[17]\d{8}$").expect("MSISDN pattern is valid"));

/// Strips non-digits and rewrites local prefixes to `254`.
///
/// `0712345678`, `712345678` and `+254 712 345 678` all become `254712345678`.
/// The result is not validated; see [`is_valid_msisdn`].
pub fn normalize_phone(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    if let Some(rest) = digits.strip_prefix('0') {
        format!("254{rest}")
    } else if digits.starts_with('7') || digits.starts_with('1') {
        format!("254{digits}")
    } else {
        digits
    }
}

/// True for `2547XXXXXXXX` and `2541XXXXXXXX`.
pub fn is_valid_msisdn(phone: &str) -> bool {
    MSISDN.is_match(phone)
}

/// Normalizes `input` and rejects anything Daraja would refuse.
pub fn parse_phone(input: &str) -> Result<String, StoreError> {
    let normalized = normalize_phone(input);
    if is_valid_msisdn(&normalized) {
        Ok(normalized)
    } else {
        Err(StoreError::Validation(format!(
            "`{input}` is not a valid Safaricom number (expected 07XXXXXXXX, 01XXXXXXXX or 254XXXXXXXXX)"
        )))
    }
}
