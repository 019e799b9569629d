// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the AutoSpares storefront backend.
//!
//! This crate provides the trait definitions, error type, and domain types
//! shared by storage, the LLM provider, the payment gateway, the HTTP
//! surface, and the client SDK.

pub mod error;
pub mod money;
pub mod traits;
pub mod types;

pub use error::StoreError;
pub use money::{format_ksh, parse_ksh};
pub use types::{AdapterType, HealthStatus, SessionId, SessionToken};

pub use traits::{MailAdapter, PaymentAdapter, PluginAdapter, ProviderAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_messages() {
        let err = StoreError::not_found("order", "o-1");
        assert_eq!(err.to_string(), "order not found: o-1");

        let err = StoreError::Validation("phone number is required".into());
        assert_eq!(err.to_string(), "validation error: phone number is required");

        let err = StoreError::Payment {
            message: "stk push rejected".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "payment error: stk push rejected");
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Provider,
            AdapterType::Storage,
            AdapterType::Payment,
            AdapterType::Mail,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_payment_adapter<T: PaymentAdapter>() {}
        fn _assert_mail_adapter<T: MailAdapter>() {}
    }
}
