// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checkout math and order placement.

use std::collections::HashMap;
use std::sync::Arc;

use autospares_config::model::CheckoutConfig;
use autospares_core::types::{CustomerInfo, NewOrder, Order, OrderLine};
use autospares_core::{StorageAdapter, StoreError};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Derived order totals, in shillings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckoutTotals {
    pub subtotal: f64,
    pub shipping: f64,
    pub tax: f64,
    pub total: f64,
}

/// Applies the shipping and VAT rules to a subtotal.
///
/// Shipping is free strictly above the threshold. Tax rounds to whole shillings.
pub fn compute_totals(subtotal: f64, rules: &CheckoutConfig) -> CheckoutTotals {
    let shipping = if subtotal > rules.free_shipping_threshold {
        0.0
    } else {
        rules.shipping_fee
    };
    let tax = (subtotal * rules.tax_rate).round();
    CheckoutTotals {
        subtotal,
        shipping,
        tax,
        total: subtotal + shipping + tax,
    }
}

/// `ORD-<unix millis>`.
pub fn order_number() -> String {
    format!("ORD-{}", chrono::Utc::now().timestamp_millis())
}

/// An order as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: String,
    pub order_number: String,
    pub customer_id: String,
    pub status: String,
    pub totals: CheckoutTotals,
}

impl From<&Order> for PlacedOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            customer_id: order.customer_id.clone(),
            status: order.status.clone(),
            totals: CheckoutTotals {
                subtotal: order.subtotal,
                shipping: order.shipping_amount,
                tax: order.tax_amount,
                total: order.total_amount,
            },
        }
    }
}

/// Turns carts into persisted orders.
#[derive(Clone)]
pub struct OrderService {
    storage: Arc<dyn StorageAdapter>,
    rules: CheckoutConfig,
}

impl OrderService {
    pub fn new(storage: Arc<dyn StorageAdapter>, rules: CheckoutConfig) -> Self {
        Self { storage, rules }
    }

    pub fn rules(&self) -> &CheckoutConfig {
        &self.rules
    }

    /// Places an order for everything in the session cart.
    pub async fn place_cart_order(
        &self,
        session_id: &str,
        customer: CustomerInfo,
        notes: Option<String>,
    ) -> Result<PlacedOrder, StoreError> {
        let cart = self.storage.get_cart(session_id).await?;
        if cart.is_empty() {
            return Err(StoreError::Validation("cart is empty".into()));
        }
        let lines = cart.iter().map(OrderLine::from).collect();
        self.place_order(customer, lines, notes).await
    }

    /// Places an order for `lines`.
    ///
    /// Catalog products override the caller's names and prices and supply
    /// SKUs. Lines for unknown products keep what the caller sent. Totals are
    /// always recomputed here.
    pub async fn place_order(
        &self,
        customer: CustomerInfo,
        lines: Vec<OrderLine>,
        notes: Option<String>,
    ) -> Result<PlacedOrder, StoreError> {
        validate_customer(&customer)?;
        if lines.is_empty() {
            return Err(StoreError::Validation("order has no items".into()));
        }
        if let Some(bad) = lines.iter().find(|l| l.quantity == 0) {
            return Err(StoreError::Validation(format!(
                "order item {} must have a quantity of at least 1",
                bad.product_id
            )));
        }

        let ids: Vec<String> = lines.iter().map(|l| l.product_id.clone()).collect();
        let catalog: HashMap<String, _> = self
            .storage
            .get_products(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let items: Vec<OrderLine> = lines
            .into_iter()
            .map(|mut line| {
                if let Some(product) = catalog.get(&line.product_id) {
                    line.product_name = product.name.clone();
                    line.product_sku = Some(product.sku.clone());
                    line.unit_price = product.effective_price();
                }
                line
            })
            .collect();

        let subtotal = items
            .iter()
            .map(|l| l.unit_price * f64::from(l.quantity))
            .sum();
        let totals = compute_totals(subtotal, &self.rules);

        let order = self
            .storage
            .create_order(&NewOrder {
                order_number: order_number(),
                customer,
                items,
                subtotal: totals.subtotal,
                tax_amount: totals.tax,
                shipping_amount: totals.shipping,
                total_amount: totals.total,
                notes,
            })
            .await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = order.total_amount,
            "order placed"
        );
        Ok(PlacedOrder::from(&order))
    }
}

fn validate_customer(customer: &CustomerInfo) -> Result<(), StoreError> {
    if customer.first_name.trim().is_empty() {
        return Err(StoreError::Validation("customer first name is required".into()));
    }
    if !customer.email.contains('@') {
        return Err(StoreError::Validation("customer email is invalid".into()));
    }
    if customer.phone.trim().is_empty() {
        return Err(StoreError::Validation("customer phone is required".into()));
    }
    Ok(())
}
