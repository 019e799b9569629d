// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::StoreConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MPESA_ENVIRONMENTS: &[&str] = &["sandbox", "production"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &StoreConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if !LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "server.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.server.log_level
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if !(0.0..=2.0).contains(&config.gemini.temperature) {
        errors.push(ConfigError::validation(format!(
            "gemini.temperature must be between 0 and 2, got {}",
            config.gemini.temperature
        )));
    }

    if !(0.0..=1.0).contains(&config.gemini.top_p) {
        errors.push(ConfigError::validation(format!(
            "gemini.top_p must be between 0 and 1, got {}",
            config.gemini.top_p
        )));
    }

    if !MPESA_ENVIRONMENTS.contains(&config.mpesa.environment.as_str()) {
        errors.push(ConfigError::validation(format!(
            "mpesa.environment must be `sandbox` or `production`, got `{}`",
            config.mpesa.environment
        )));
    }

    if config.mpesa.shortcode.is_empty() || !config.mpesa.shortcode.chars().all(|c| c.is_ascii_digit())
    {
        errors.push(ConfigError::validation(format!(
            "mpesa.shortcode must be numeric, got `{}`",
            config.mpesa.shortcode
        )));
    }

    if config.mpesa.environment == "production" && config.mpesa.passkey.is_none() {
        errors.push(ConfigError::validation(
            "mpesa.passkey is required in production",
        ));
    }

    if let Some(url) = &config.mpesa.callback_url
        && !url.starts_with("https://")
        && !url.starts_with("http://")
    {
        errors.push(ConfigError::validation(format!(
            "mpesa.callback_url must be an http(s) URL, got `{url}`"
        )));
    }

    if config.chat.recommendation_count > config.chat.recommendation_pool {
        errors.push(ConfigError::validation(format!(
            "chat.recommendation_count ({}) must not exceed chat.recommendation_pool ({})",
            config.chat.recommendation_count, config.chat.recommendation_pool
        )));
    }

    if !(0.0..=1.0).contains(&config.checkout.tax_rate) {
        errors.push(ConfigError::validation(format!(
            "checkout.tax_rate must be a fraction between 0 and 1, got {}",
            config.checkout.tax_rate
        )));
    }

    for (key, value) in [
        ("checkout.shipping_fee", config.checkout.shipping_fee),
        (
            "checkout.free_shipping_threshold",
            config.checkout.free_shipping_threshold,
        ),
    ] {
        if value < 0.0 {
            errors.push(ConfigError::validation(format!(
                "{key} must be non-negative, got {value}"
            )));
        }
    }

    if config.email.smtp_host.is_some() && config.email.from.trim().is_empty() {
        errors.push(ConfigError::validation(
            "email.from must be set when email.smtp_host is configured",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
