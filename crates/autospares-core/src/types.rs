// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across adapter traits, storage, and the HTTP surface.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::money::format_ksh;

/// Unique identifier for a chat session (a UUID string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

/// Opaque token correlating a client with its server-side session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Payment,
    Mail,
}

/// Author of a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Lifecycle of an order row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

/// Status of a payment as tracked against the mobile-money provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Completed, failed and refunded payments never change again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

// --- Sessions and messages ---

/// A persisted chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub user_token: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A single entry in a session's append-only message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    /// JSON text, e.g. `{"tool_results":[...]}`.
    pub metadata: Option<String>,
    pub created_at: String,
}

// --- Cart ---

/// One product line in a session cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CartLine {
    /// `unit_price * quantity`.
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// Cart contents plus derived totals, as returned to clients and tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    pub total_items: u32,
    pub total_value: f64,
    pub has_items: bool,
    pub formatted_total: String,
}

impl CartSummary {
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let total_items = items.iter().map(|l| l.quantity).sum();
        let total_value = items.iter().map(CartLine::line_total).sum();
        Self {
            has_items: !items.is_empty(),
            formatted_total: format_ksh(total_value),
            items,
            total_items,
            total_value,
        }
    }
}

/// Frames exchanged on the cart WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartFrame {
    /// Server push: the session cart now looks like this.
    CartUpdated { cart: CartSummary },
    Ping,
    Pong,
}

// --- Catalog ---

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Sale price when present, list price otherwise.
    pub fn effective_price(&self) -> f64 {
        self.sale_price.unwrap_or(self.price)
    }
}

/// Filter for catalog listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    /// Matched case-insensitively against name, brand and description.
    pub search: Option<String>,
    pub limit: usize,
}

// --- Orders ---

/// Customer details captured at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl CustomerInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// A line to be written into `order_items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub product_sku: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            product_name: line.product_name.clone(),
            product_sku: None,
            quantity: line.quantity,
            unit_price: line.unit_price,
        }
    }
}

/// Everything needed to create a customer, an order and its items atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_number: String,
    pub customer: CustomerInfo,
    pub items: Vec<OrderLine>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub shipping_amount: f64,
    pub total_amount: f64,
    pub notes: Option<String>,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub customer_id: String,
    pub status: String,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub shipping_amount: f64,
    pub total_amount: f64,
    pub shipping_address: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A persisted order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_sku: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
}

// --- Payments ---

/// A row in `mpesa_payments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpesaPayment {
    pub id: String,
    pub order_id: Option<String>,
    pub phone_number: String,
    pub amount: f64,
    pub status: String,
    pub checkout_request_id: Option<String>,
    pub merchant_request_id: Option<String>,
    pub result_code: Option<i64>,
    pub result_desc: Option<String>,
    pub mpesa_receipt_number: Option<String>,
    pub transaction_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Result delivered by the provider's STK callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub result_code: i64,
    pub result_desc: String,
    pub receipt_number: Option<String>,
    pub transaction_date: Option<String>,
    pub phone_number: Option<String>,
    pub amount: Option<f64>,
    /// The callback body as received, kept for the ledger.
    pub raw: String,
}

impl PaymentResult {
    pub fn status(&self) -> PaymentStatus {
        if self.result_code == 0 {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Failed
        }
    }
}

/// A callback applied to a pending payment, with any order confirmation and
/// ledger row written in the same transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSettlement {
    pub payment: MpesaPayment,
    pub order_confirmed: bool,
}

/// A row in the general `payments` ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub order_id: String,
    pub amount: f64,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub status: String,
    pub processed_at: Option<String>,
    pub gateway_response: Option<String>,
}

/// Request to push a payment prompt to a phone.
#[derive(Debug, Clone, PartialEq)]
pub struct StkPushRequest {
    /// Normalized `2547XXXXXXXX` / `2541XXXXXXXX` number.
    pub phone_number: String,
    /// Whole shillings.
    pub amount: u64,
    pub account_reference: String,
    pub description: String,
}

/// Provider acknowledgement of an accepted STK push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StkPushAck {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub response_code: String,
    pub response_description: String,
    pub customer_message: Option<String>,
}

// --- Invoices ---

/// One row on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

/// Data rendered into an invoice email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub to: String,
    pub order_number: String,
    pub customer_name: String,
    pub order_total: f64,
    pub order_items: Vec<InvoiceItem>,
}

// --- LLM provider exchange ---

/// Speaker of a conversation turn sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// A single part of a conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnPart {
    Text {
        text: String,
    },
    FunctionCall {
        name: String,
        args: serde_json::Value,
    },
    FunctionResponse {
        name: String,
        response: serde_json::Value,
    },
}

impl TurnPart {
    pub fn text(text: impl Into<String>) -> Self {
        TurnPart::Text { text: text.into() }
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<TurnPart>,
}

impl Turn {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![TurnPart::text(text)],
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![TurnPart::text(text)],
        }
    }
}

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// A request to an LLM provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderRequest {
    pub system_instruction: Option<String>,
    pub turns: Vec<Turn>,
    pub tools: Vec<ToolDeclaration>,
}

/// A function call extracted from a provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: serde_json::Value,
}

/// A response from an LLM provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderResponse {
    pub parts: Vec<TurnPart>,
    pub finish_reason: Option<String>,
}

impl ProviderResponse {
    /// Concatenated text parts, or `None` when the model produced no text.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .parts
            .iter()
            .filter_map(|p| match p {
                TurnPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn function_calls(&self) -> Vec<FunctionCall> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                TurnPart::FunctionCall { name, args } => Some(FunctionCall {
                    name: name.clone(),
                    args: args.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}
