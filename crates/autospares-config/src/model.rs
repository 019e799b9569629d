// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the AutoSpares backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional and defaults to values
/// that work against the M-Pesa sandbox.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// M-Pesa Daraja API settings.
    #[serde(default)]
    pub mpesa: MpesaConfig,

    /// Shopping assistant behavior.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Shipping and tax rules.
    #[serde(default)]
    pub checkout: CheckoutConfig,

    /// Outbound email (invoices).
    #[serde(default)]
    pub email: EmailConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Upper bound on a single chat request, including both model round trips.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("autospares").join("autospares.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("autospares.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. `None` falls back to the `GEMINI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for `generateContent`.
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API root, without the `/models/...` suffix.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_k")]
    pub top_k: u32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Retries on 429/500/503 before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_k() -> u32 {
    40
}

fn default_top_p() -> f32 {
    0.95
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_max_retries() -> u32 {
    1
}

/// M-Pesa Daraja API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MpesaConfig {
    /// `sandbox` or `production`.
    #[serde(default = "default_mpesa_environment")]
    pub environment: String,

    /// Overrides the environment's API root (used by tests).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Daraja app consumer key. `None` falls back to `MPESA_CONSUMER_KEY`.
    #[serde(default)]
    pub consumer_key: Option<String>,

    /// Daraja app consumer secret. `None` falls back to `MPESA_CONSUMER_SECRET`.
    #[serde(default)]
    pub consumer_secret: Option<String>,

    /// Paybill / till shortcode.
    #[serde(default = "default_shortcode")]
    pub shortcode: String,

    /// Lipa Na M-Pesa passkey. `None` uses the public sandbox passkey in sandbox.
    #[serde(default)]
    pub passkey: Option<String>,

    /// Public URL Safaricom posts STK results to.
    #[serde(default)]
    pub callback_url: Option<String>,

    /// HTTP timeout for Daraja calls.
    #[serde(default = "default_mpesa_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MpesaConfig {
    fn default() -> Self {
        Self {
            environment: default_mpesa_environment(),
            base_url: None,
            consumer_key: None,
            consumer_secret: None,
            shortcode: default_shortcode(),
            passkey: None,
            callback_url: None,
            timeout_secs: default_mpesa_timeout_secs(),
        }
    }
}

fn default_mpesa_environment() -> String {
    "sandbox".to_string()
}

fn default_shortcode() -> String {
    "174379".to_string()
}

fn default_mpesa_timeout_secs() -> u64 {
    30
}

/// Shopping assistant configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Number of prior messages replayed to the model.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Products fetched before picking welcome recommendations.
    #[serde(default = "default_recommendation_pool")]
    pub recommendation_pool: usize,

    /// Products shown on the welcome message.
    #[serde(default = "default_recommendation_count")]
    pub recommendation_count: usize,

    /// Inline system prompt string. Overridden by `system_prompt_file` if both set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a markdown file containing the system prompt.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            recommendation_pool: default_recommendation_pool(),
            recommendation_count: default_recommendation_count(),
            system_prompt: None,
            system_prompt_file: None,
        }
    }
}

fn default_history_limit() -> usize {
    10
}

fn default_recommendation_pool() -> usize {
    10
}

fn default_recommendation_count() -> usize {
    3
}

/// Shipping and tax configuration. Amounts are in shillings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutConfig {
    /// Subtotals strictly above this ship free.
    #[serde(default = "default_free_shipping_threshold")]
    pub free_shipping_threshold: f64,

    #[serde(default = "default_shipping_fee")]
    pub shipping_fee: f64,

    /// VAT as a fraction of the subtotal.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: default_free_shipping_threshold(),
            shipping_fee: default_shipping_fee(),
            tax_rate: default_tax_rate(),
        }
    }
}

fn default_free_shipping_threshold() -> f64 {
    5000.0
}

fn default_shipping_fee() -> f64 {
    500.0
}

fn default_tax_rate() -> f64 {
    0.16
}

/// SMTP configuration for invoice email. `smtp_host = None` disables sending.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// RFC 5322 mailbox used as the sender.
    #[serde(default = "default_from")]
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from: default_from(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from() -> String {
    "AutoSpares Kenya <noreply@autospareskenya.com>".to_string()
}
