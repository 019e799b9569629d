// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog tools: listing, search and stock checks.

use std::sync::Arc;

use async_trait::async_trait;
use autospares_core::types::ProductQuery;
use autospares_core::{StorageAdapter, StoreError};
use serde::Deserialize;
use serde_json::json;

use super::{Tool, ToolContext, ToolOutput, parse_args};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

/// Lists active products, optionally filtered.
pub struct GetProductsTool {
    storage: Arc<dyn StorageAdapter>,
}

impl GetProductsTool {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }
}

#[derive(Debug, Deserialize)]
struct GetProductsArgs {
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    limit: Option<f64>,
}

fn clamp_limit(limit: Option<f64>) -> usize {
    match limit {
        Some(n) if n.is_finite() && n >= 1.0 => (n as usize).min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    }
}

#[async_trait]
impl Tool for GetProductsTool {
    fn name(&self) -> &str {
        "get_products"
    }

    fn description(&self) -> &str {
        "List auto parts in the catalog, optionally filtered by category or a search term"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Product category filter (brakes, engine, lighting, etc.)"
                },
                "search": { "type": "string", "description": "Search term" },
                "limit": {
                    "type": "number",
                    "description": "Number of products to return (default: 10)"
                }
            }
        })
    }

    async fn invoke(
        &self,
        _ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<ToolOutput, StoreError> {
        let args: GetProductsArgs = parse_args(self.name(), input)?;
        let products = self
            .storage
            .list_products(&ProductQuery {
                category: args.category,
                search: args.search,
                limit: clamp_limit(args.limit),
            })
            .await?;
        Ok(ToolOutput::success(serde_json::to_value(products)?))
    }
}

/// Free-text search over name, brand and description.
pub struct SearchProductsTool {
    storage: Arc<dyn StorageAdapter>,
}

impl SearchProductsTool {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

#[async_trait]
impl Tool for SearchProductsTool {
    fn name(&self) -> &str {
        "search_products"
    }

    fn description(&self) -> &str {
        "Search auto parts by name, brand or description"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Natural language search query" }
            },
            "required": ["query"]
        })
    }

    async fn invoke(
        &self,
        _ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<ToolOutput, StoreError> {
        let args: SearchArgs = parse_args(self.name(), input)?;
        if args.query.trim().is_empty() {
            return Ok(ToolOutput::error("search query must not be empty"));
        }
        let products = self
            .storage
            .list_products(&ProductQuery {
                category: None,
                search: Some(args.query),
                limit: DEFAULT_LIMIT,
            })
            .await?;
        Ok(ToolOutput::success(serde_json::to_value(products)?))
    }
}

/// Reports stock for specific products.
pub struct CheckInventoryTool {
    storage: Arc<dyn StorageAdapter>,
}

impl CheckInventoryTool {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }
}

#[derive(Debug, Deserialize)]
struct InventoryArgs {
    product_ids: Vec<String>,
    #[serde(default)]
    quantity_required: Option<u32>,
}

#[async_trait]
impl Tool for CheckInventoryTool {
    fn name(&self) -> &str {
        "check_inventory"
    }

    fn description(&self) -> &str {
        "Check current stock for one or more products"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "product_ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Product IDs to check"
                },
                "quantity_required": { "type": "number", "description": "Required quantity" }
            },
            "required": ["product_ids"]
        })
    }

    async fn invoke(
        &self,
        _ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<ToolOutput, StoreError> {
        let args: InventoryArgs = parse_args(self.name(), input)?;
        let required = i64::from(args.quantity_required.unwrap_or(1).max(1));
        let found = self.storage.get_products(&args.product_ids).await?;

        let items: Vec<serde_json::Value> = args
            .product_ids
            .iter()
            .map(|id| match found.iter().find(|p| &p.id == id) {
                Some(p) => json!({
                    "product_id": p.id,
                    "name": p.name,
                    "stock_quantity": p.stock_quantity,
                    "is_active": p.is_active,
                    "available": p.is_active && p.stock_quantity >= required,
                }),
                None => json!({ "product_id": id, "found": false, "available": false }),
            })
            .collect();
        let all_available = items.iter().all(|i| i["available"] == true);

        Ok(ToolOutput::success(json!({
            "items": items,
            "quantity_required": required,
            "all_available": all_available,
        })))
    }
}
