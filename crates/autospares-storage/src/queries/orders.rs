// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer, order and order-item writes.

use autospares_core::StoreError;
use autospares_core::types::{NewOrder, Order, OrderItem, OrderStatus};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, now_timestamp};

const ORDER_COLUMNS: &str = "id, order_number, customer_id, status, subtotal, tax_amount, \
     shipping_amount, total_amount, shipping_address, notes, created_at, updated_at";

fn row_to_order(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        id: row.get(0)?,
        order_number: row.get(1)?,
        customer_id: row.get(2)?,
        status: row.get(3)?,
        subtotal: row.get(4)?,
        tax_amount: row.get(5)?,
        shipping_amount: row.get(6)?,
        total_amount: row.get(7)?,
        shipping_address: row.get(8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Create the customer, the order and its items in a single transaction.
pub async fn create_order(db: &Database, new_order: &NewOrder) -> Result<Order, StoreError> {
    let customer_id = uuid::Uuid::new_v4().to_string();
    let now = now_timestamp();
    let shipping_address = serde_json::json!({
        "address": new_order.customer.address,
        "city": new_order.customer.city,
        "phone": new_order.customer.phone,
    })
    .to_string();

    let order = Order {
        id: uuid::Uuid::new_v4().to_string(),
        order_number: new_order.order_number.clone(),
        customer_id: customer_id.clone(),
        status: OrderStatus::Pending.to_string(),
        subtotal: new_order.subtotal,
        tax_amount: new_order.tax_amount,
        shipping_amount: new_order.shipping_amount,
        total_amount: new_order.total_amount,
        shipping_address: Some(shipping_address),
        notes: new_order.notes.clone(),
        created_at: now.clone(),
        updated_at: now,
    };

    let full_name = new_order.customer.full_name();
    let email = new_order.customer.email.clone();
    let phone = new_order.customer.phone.clone();
    let items = new_order.items.clone();
    let row = order.clone();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO customers (id, full_name, email, phone) VALUES (?1, ?2, ?3, ?4)",
                params![customer_id, full_name, email, phone],
            )?;
            tx.execute(
                "INSERT INTO orders
                    (id, order_number, customer_id, status, subtotal, tax_amount, shipping_amount,
                     total_amount, shipping_address, billing_address, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, ?11, ?12)",
                params![
                    row.id,
                    row.order_number,
                    row.customer_id,
                    row.status,
                    row.subtotal,
                    row.tax_amount,
                    row.shipping_amount,
                    row.total_amount,
                    row.shipping_address,
                    row.notes,
                    row.created_at,
                    row.updated_at,
                ],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO order_items
                        (id, order_id, product_id, product_name, product_sku, quantity, unit_price, total_price)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for item in &items {
                    stmt.execute(params![
                        uuid::Uuid::new_v4().to_string(),
                        row.id,
                        item.product_id,
                        item.product_name,
                        item.product_sku,
                        item.quantity,
                        item.unit_price,
                        item.unit_price * f64::from(item.quantity),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    Ok(order)
}

/// Get an order by ID.
pub async fn get_order(db: &Database, id: &str) -> Result<Option<Order>, StoreError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                params![id],
                row_to_order,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Items of an order.
pub async fn get_order_items(db: &Database, order_id: &str) -> Result<Vec<OrderItem>, StoreError> {
    let order_id = order_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, order_id, product_id, product_name, product_sku, quantity, unit_price, total_price
                 FROM order_items WHERE order_id = ?1 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(params![order_id], |row| {
                Ok(OrderItem {
                    id: row.get(0)?,
                    order_id: row.get(1)?,
                    product_id: row.get(2)?,
                    product_name: row.get(3)?,
                    product_sku: row.get(4)?,
                    quantity: row.get(5)?,
                    unit_price: row.get(6)?,
                    total_price: row.get(7)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set an order's status inside a caller's transaction; returns rows changed.
pub(crate) fn set_order_status(
    conn: &rusqlite::Connection,
    id: &str,
    status: OrderStatus,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE orders SET status = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?2",
        params![status.to_string(), id],
    )
}
