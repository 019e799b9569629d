// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry for the shopping assistant's function calls.
//!
//! The [`Tool`] trait is the interface every storefront capability exposes to
//! the model. The [`ToolRegistry`] resolves calls by name and produces the
//! function declarations sent with each provider request.

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod payments;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use autospares_core::types::ToolDeclaration;
use autospares_core::{StorageAdapter, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cart::CartService;
use crate::checkout::OrderService;
use crate::payments::PaymentService;

/// Output from a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// JSON handed back to the model and the client.
    pub content: serde_json::Value,
    /// Whether the invocation failed in a way the model should see.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: serde_json::Value) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: serde_json::Value::String(message.into()),
            is_error: true,
        }
    }
}

/// Per-call context: which session the model is acting for.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub session_id: String,
}

/// A capability the model can call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool's unique name (used for lookup and declarations).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<ToolOutput, StoreError>;
}

/// Registry of available tools, indexed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool under its `name()`, replacing any previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// (name, description) pairs sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }

    /// Function declarations for every registered tool, sorted by name.
    pub fn tool_definitions(&self) -> Vec<ToolDeclaration> {
        let mut defs: Vec<ToolDeclaration> = self
            .tools
            .values()
            .map(|t| ToolDeclaration {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Services the built-in tools act through.
#[derive(Clone)]
pub struct ToolServices {
    pub storage: Arc<dyn StorageAdapter>,
    pub cart: CartService,
    pub orders: OrderService,
    pub payments: PaymentService,
}

/// Registers the storefront tools into `registry`.
pub fn register_builtins(registry: &mut ToolRegistry, services: &ToolServices) {
    registry.register(Arc::new(catalog::GetProductsTool::new(services.storage.clone())));
    registry.register(Arc::new(catalog::SearchProductsTool::new(services.storage.clone())));
    registry.register(Arc::new(catalog::CheckInventoryTool::new(services.storage.clone())));
    registry.register(Arc::new(cart::GetCartStatusTool::new(services.cart.clone())));
    registry.register(Arc::new(cart::SyncCartTool::new(services.cart.clone())));
    registry.register(Arc::new(orders::CreateOrderTool::new(services.orders.clone())));
    registry.register(Arc::new(orders::ShippingEstimateTool::new(
        services.cart.clone(),
        services.orders.clone(),
    )));
    registry.register(Arc::new(payments::InitiatePaymentTool::new(
        services.payments.clone(),
    )));
}

/// Deserializes tool arguments, mapping failures to a validation error.
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: &str,
    input: serde_json::Value,
) -> Result<T, StoreError> {
    // Models sometimes send `null` for a tool without arguments.
    let input = if input.is_null() {
        serde_json::json!({})
    } else {
        input
    };
    serde_json::from_value(input)
        .map_err(|e| StoreError::Validation(format!("invalid arguments for {tool}: {e}")))
}
