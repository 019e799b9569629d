// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order placement and shipping estimate tools.

use async_trait::async_trait;
use autospares_core::types::{CustomerInfo, OrderLine};
use autospares_core::{StoreError, format_ksh};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Tool, ToolContext, ToolOutput, parse_args};
use crate::cart::CartService;
use crate::checkout::{OrderService, compute_totals};

const NAIROBI_DELIVERY: &str = "1-2 business days";
const COUNTRYWIDE_DELIVERY: &str = "2-5 business days";

/// Item shape the model sends for orders and estimates.
#[derive(Debug, Clone, Deserialize)]
struct ItemArg {
    product_id: String,
    #[serde(default, alias = "product_name")]
    name: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default = "one")]
    quantity: u32,
    #[serde(default, alias = "unit_price")]
    price: Option<f64>,
}

fn one() -> u32 {
    1
}

impl From<ItemArg> for OrderLine {
    fn from(item: ItemArg) -> Self {
        Self {
            product_name: item.name.unwrap_or_else(|| "Product".to_string()),
            product_sku: item.sku,
            quantity: item.quantity,
            unit_price: item.price.unwrap_or(0.0),
            product_id: item.product_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CustomerArg {
    #[serde(alias = "firstName")]
    first_name: String,
    #[serde(default, alias = "lastName")]
    last_name: String,
    email: String,
    phone: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

impl From<CustomerArg> for CustomerInfo {
    fn from(c: CustomerArg) -> Self {
        Self {
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            phone: c.phone,
            address: c.address,
            city: c.city,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateOrderArgs {
    #[serde(default)]
    items: Vec<ItemArg>,
    customer_info: CustomerArg,
    #[serde(default)]
    total_amount: Option<f64>,
    #[serde(default, alias = "special_instructions")]
    notes: Option<String>,
}

/// Creates a pending order for the customer.
pub struct CreateOrderTool {
    orders: OrderService,
}

impl CreateOrderTool {
    pub fn new(orders: OrderService) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl Tool for CreateOrderTool {
    fn name(&self) -> &str {
        "create_order"
    }

    fn description(&self) -> &str {
        "Create a new order for the customer. With no items, the current cart is ordered"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "description": "Order items with product_id, quantity and price",
                    "items": {
                        "type": "object",
                        "properties": {
                            "product_id": { "type": "string" },
                            "name": { "type": "string" },
                            "quantity": { "type": "number" },
                            "price": { "type": "number" }
                        }
                    }
                },
                "customer_info": {
                    "type": "object",
                    "description": "Customer contact and delivery details",
                    "properties": {
                        "firstName": { "type": "string" },
                        "lastName": { "type": "string" },
                        "email": { "type": "string" },
                        "phone": { "type": "string" },
                        "address": { "type": "string" },
                        "city": { "type": "string" }
                    }
                },
                "total_amount": { "type": "number", "description": "Total order amount" },
                "special_instructions": {
                    "type": "string",
                    "description": "Special delivery instructions"
                }
            },
            "required": ["items", "customer_info", "total_amount"]
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<ToolOutput, StoreError> {
        let args: CreateOrderArgs = parse_args(self.name(), input)?;
        let customer = CustomerInfo::from(args.customer_info);
        let placed = if args.items.is_empty() {
            self.orders
                .place_cart_order(&ctx.session_id, customer, args.notes)
                .await?
        } else {
            let lines = args.items.into_iter().map(OrderLine::from).collect();
            self.orders.place_order(customer, lines, args.notes).await?
        };

        if let Some(claimed) = args.total_amount
            && (claimed - placed.totals.total).abs() >= 1.0
        {
            debug!(
                claimed,
                computed = placed.totals.total,
                "model total differs from computed total"
            );
        }

        Ok(ToolOutput::success(json!({
            "order_id": placed.order_id,
            "order_number": placed.order_number,
            "customer_id": placed.customer_id,
            "subtotal": placed.totals.subtotal,
            "shipping_amount": placed.totals.shipping,
            "tax_amount": placed.totals.tax,
            "total_amount": placed.totals.total,
            "formatted_total": format_ksh(placed.totals.total),
            "status": placed.status,
        })))
    }
}

#[derive(Debug, Deserialize)]
struct EstimateArgs {
    destination_city: String,
    #[serde(default)]
    items: Vec<ItemArg>,
    #[serde(default)]
    shipping_method: Option<String>,
}

/// Quotes shipping, VAT and delivery time for a set of items.
pub struct ShippingEstimateTool {
    cart: CartService,
    orders: OrderService,
}

impl ShippingEstimateTool {
    pub fn new(cart: CartService, orders: OrderService) -> Self {
        Self { cart, orders }
    }
}

#[async_trait]
impl Tool for ShippingEstimateTool {
    fn name(&self) -> &str {
        "get_shipping_estimate"
    }

    fn description(&self) -> &str {
        "Calculate shipping cost and delivery time. With no items, the current cart is used"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "destination_city": { "type": "string", "description": "Delivery city" },
                "items": {
                    "type": "array",
                    "description": "Items for shipping calculation",
                    "items": {
                        "type": "object",
                        "properties": {
                            "product_id": { "type": "string" },
                            "quantity": { "type": "number" },
                            "price": { "type": "number" }
                        }
                    }
                },
                "shipping_method": { "type": "string", "description": "Preferred shipping method" }
            },
            "required": ["destination_city", "items"]
        })
    }

    async fn invoke(
        &self,
        ctx: &ToolContext,
        input: serde_json::Value,
    ) -> Result<ToolOutput, StoreError> {
        let args: EstimateArgs = parse_args(self.name(), input)?;
        let subtotal = if args.items.is_empty() {
            self.cart.summary(&ctx.session_id).await?.total_value
        } else {
            args.items
                .iter()
                .map(|i| i.price.unwrap_or(0.0) * f64::from(i.quantity))
                .sum()
        };
        let totals = compute_totals(subtotal, self.orders.rules());
        let city = args.destination_city.trim();
        let delivery = if city.eq_ignore_ascii_case("nairobi") {
            NAIROBI_DELIVERY
        } else {
            COUNTRYWIDE_DELIVERY
        };

        Ok(ToolOutput::success(json!({
            "destination_city": city,
            "shipping_method": args.shipping_method.unwrap_or_else(|| "standard".into()),
            "subtotal": totals.subtotal,
            "shipping_cost": totals.shipping,
            "free_shipping": totals.shipping == 0.0,
            "tax_amount": totals.tax,
            "total": totals.total,
            "formatted_total": format_ksh(totals.total),
            "estimated_delivery": delivery,
        })))
    }
}
