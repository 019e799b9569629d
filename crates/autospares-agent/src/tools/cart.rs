// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cart tools.

use async_trait::async_trait;
use autospares_core::StoreError;
use autospares_core::types::{CartLine, CartSummary};
use serde::Deserialize;
use serde_json::json;

use super::{Tool, ToolContext, ToolOutput, parse_args};
use crate::cart::CartService;

/// Summary JSON with a `total_price` on every line.
pub fn cart_status_json(summary: &CartSummary) -> serde_json::Value {
    let items: Vec<serde_json::Value> = summary
        .items
        .iter()
        .map(|line| {
            json!({
                "product_id": line.product_id,
                "product_name": line.product_name,
                "brand": line.brand,
                "quantity": line.quantity,
                "unit_price": line.unit_price,
                "total_price": line.line_total(),
                "image_url": line.image_url,
            })
        })
        .collect();
    json!({
        "items": items,
        "total_items": summary.total_items,
        "total_value": summary.total_value,
        "has_items": summary.has_items,
        "formatted_total": summary.formatted_total,
    })
}

/// Reads the server copy of the session cart.
pub struct GetCartStatusTool {
    cart: CartService,
}

impl GetCartStatusTool {
    pub fn new(cart: CartService) -> Self {
        Self { cart }
    }
}

#[async_trait]
impl Tool for GetCartStatusTool {
    fn name(&self) -> &str {
        "get_cart_status"
    }

    fn description(&self) -> &str {
        "Get the customer's current cart contents and total"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        _input: serde_json::Value,
    ) -> Result<ToolOutput, StoreError> {
        let summary = self.cart.summary(&ctx.session_id).await?;
        Ok(ToolOutput::success(cart_status_json(&summary)))
    }
}

/// Replaces the session cart with the lines the model sends.
pub struct SyncCartTool {
    cart: CartService,
}

impl SyncCartTool {
    pub fn new(cart: CartService) -> Self {
        Self { cart }
    }
}

#[derive(Debug, Deserialize)]
struct SyncArgs {
    #[serde(default)]
    cart_items: Vec<CartLine>,
}

#[async_trait]
impl Tool for SyncCartTool {
    fn name(&self) -> &str {
        "sync_cart"
    }

    fn description(&self) -> &str {
        "Sync cart items from the storefront to the backend"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "cart_items": {
                    "type": "array",
                    "description": "Array of cart items to sync",
                    "items": {
                        "type": "object",
                        "properties": {
                            "product_id": { "type": "string" },
                            "product_name": { "type": "string" },
                            "brand": { "type": "string" },
                            "quantity": { "type": "number" },
                            "unit_price": { "type": "number" },
                            "image_url": { "type": "string" }
                        }
                    }
                }
            },
            "required": ["cart_items"]
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<ToolOutput, StoreError> {
        let args: SyncArgs = parse_args(self.name(), input)?;
        let count = args.cart_items.len();
        self.cart.sync(&ctx.session_id, args.cart_items).await?;
        Ok(ToolOutput::success(json!({
            "success": true,
            "message": format!("Cart synced successfully with {count} items"),
            "synced_count": count,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CartEvents;
    use crate::tools::tests::ctx;
    use autospares_test_utils::storage::{seed_session, temp_storage};

    #[tokio::test]
    async fn sync_then_status() {
        let (storage, _dir) = temp_storage().await;
        seed_session(storage.as_ref(), "s1", "t1").await;
        let cart = CartService::new(storage, CartEvents::new());

        let sync = SyncCartTool::new(cart.clone());
        let out = sync
            .invoke(
                &ctx("s1"),
                json!({"cart_items": [
                    {"product_id": "p1", "product_name": "Brake Pads", "quantity": 2, "unit_price": 2500},
                    {"product_id": "p2", "product_name": "Wiper Blade", "quantity": 1, "unit_price": 650}
                ]}),
            )
            .await
            .unwrap();
        assert_eq!(out.content["synced_count"], 2);
        assert_eq!(out.content["message"], "Cart synced successfully with 2 items");

        let status = GetCartStatusTool::new(cart)
            .invoke(&ctx("s1"), json!({}))
            .await
            .unwrap();
        assert_eq!(status.content["total_items"], 3);
        assert_eq!(status.content["total_value"], 5650.0);
        assert_eq!(status.content["formatted_total"], "KSh 5,650");
        assert_eq!(status.content["items"][0]["total_price"], 5000.0);
    }

    #[tokio::test]
    async fn empty_status() {
        let (storage, _dir) = temp_storage().await;
        seed_session(storage.as_ref(), "s1", "t1").await;
        let tool = GetCartStatusTool::new(CartService::new(storage, CartEvents::new()));
        let out = tool.invoke(&ctx("s1"), serde_json::Value::Null).await.unwrap();
        assert_eq!(out.content["has_items"], false);
        assert_eq!(out.content["items"], json!([]));
    }
}
