// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! M-Pesa payment tracking and the general payments ledger.

use autospares_core::StoreError;
use autospares_core::types::{
    MpesaPayment, OrderStatus, PaymentRecord, PaymentResult, PaymentSettlement, PaymentStatus,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, now_timestamp};
use crate::queries::orders::set_order_status;

const MPESA_COLUMNS: &str = "id, order_id, phone_number, amount, status, checkout_request_id, \
     merchant_request_id, result_code, result_desc, mpesa_receipt_number, transaction_date, \
     created_at, updated_at";

fn row_to_mpesa(row: &rusqlite::Row<'_>) -> rusqlite::Result<MpesaPayment> {
    Ok(MpesaPayment {
        id: row.get(0)?,
        order_id: row.get(1)?,
        phone_number: row.get(2)?,
        amount: row.get(3)?,
        status: row.get(4)?,
        checkout_request_id: row.get(5)?,
        merchant_request_id: row.get(6)?,
        result_code: row.get(7)?,
        result_desc: row.get(8)?,
        mpesa_receipt_number: row.get(9)?,
        transaction_date: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Insert a new payment row (normally `pending`).
pub async fn create_mpesa_payment(db: &Database, payment: &MpesaPayment) -> Result<(), StoreError> {
    let p = payment.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO mpesa_payments
                    (id, order_id, phone_number, amount, status, checkout_request_id,
                     merchant_request_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    p.id,
                    p.order_id,
                    p.phone_number,
                    p.amount,
                    p.status,
                    p.checkout_request_id,
                    p.merchant_request_id,
                    p.created_at,
                    p.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Store the provider's request ids after a successful STK push.
pub async fn attach_checkout_ids(
    db: &Database,
    payment_id: &str,
    checkout_request_id: &str,
    merchant_request_id: &str,
) -> Result<(), StoreError> {
    let payment_id = payment_id.to_string();
    let checkout_request_id = checkout_request_id.to_string();
    let merchant_request_id = merchant_request_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE mpesa_payments SET
                    checkout_request_id = ?2,
                    merchant_request_id = ?3,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![payment_id, checkout_request_id, merchant_request_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a still-pending payment failed (the push itself was rejected).
pub async fn fail_mpesa_payment(
    db: &Database,
    payment_id: &str,
    reason: &str,
) -> Result<(), StoreError> {
    let payment_id = payment_id.to_string();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE mpesa_payments SET
                    status = 'failed',
                    result_desc = ?2,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![payment_id, reason],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a payment by ID.
pub async fn get_mpesa_payment(db: &Database, id: &str) -> Result<Option<MpesaPayment>, StoreError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MPESA_COLUMNS} FROM mpesa_payments WHERE id = ?1"),
                params![id],
                row_to_mpesa,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a payment by the provider's checkout request id.
pub async fn get_mpesa_payment_by_checkout(
    db: &Database,
    checkout_request_id: &str,
) -> Result<Option<MpesaPayment>, StoreError> {
    let checkout_request_id = checkout_request_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MPESA_COLUMNS} FROM mpesa_payments WHERE checkout_request_id = ?1"),
                params![checkout_request_id],
                row_to_mpesa,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Settle the pending payment matching a callback result.
///
/// The status flip, the order confirmation and the ledger row share one
/// transaction, so a failed write leaves the payment pending and a replayed
/// callback can finish the job. Settled payments are left untouched so
/// replays cannot flip a completed payment to failed (or back).
pub async fn settle_payment(
    db: &Database,
    result: &PaymentResult,
) -> Result<Option<PaymentSettlement>, StoreError> {
    let result = result.clone();
    let status = result.status();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE mpesa_payments SET
                    status = ?2,
                    result_code = ?3,
                    result_desc = ?4,
                    mpesa_receipt_number = COALESCE(?5, mpesa_receipt_number),
                    transaction_date = COALESCE(?6, transaction_date),
                    merchant_request_id = COALESCE(merchant_request_id, ?7),
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE checkout_request_id = ?1 AND status = ?8",
                params![
                    result.checkout_request_id,
                    status.to_string(),
                    result.result_code,
                    result.result_desc,
                    result.receipt_number,
                    result.transaction_date,
                    result.merchant_request_id,
                    PaymentStatus::Pending.to_string(),
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let payment = tx.query_row(
                &format!("SELECT {MPESA_COLUMNS} FROM mpesa_payments WHERE checkout_request_id = ?1"),
                params![result.checkout_request_id],
                row_to_mpesa,
            )?;

            let mut order_confirmed = false;
            if status == PaymentStatus::Completed
                && let Some(order_id) = payment.order_id.as_deref()
            {
                order_confirmed = set_order_status(&tx, order_id, OrderStatus::Confirmed)? > 0;
                insert_ledger_row(
                    &tx,
                    &PaymentRecord {
                        id: uuid::Uuid::new_v4().to_string(),
                        order_id: order_id.to_string(),
                        amount: result.amount.unwrap_or(payment.amount),
                        payment_method: "mpesa".into(),
                        transaction_id: result.receipt_number.clone(),
                        status: PaymentStatus::Completed.to_string(),
                        processed_at: Some(
                            result.transaction_date.clone().unwrap_or_else(now_timestamp),
                        ),
                        gateway_response: Some(result.raw.clone()),
                    },
                )?;
            }
            tx.commit()?;
            Ok(Some(PaymentSettlement {
                payment,
                order_confirmed,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append a row to the general payments ledger.
fn insert_ledger_row(conn: &rusqlite::Connection, r: &PaymentRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO payments
            (id, order_id, amount, payment_method, transaction_id, status, processed_at, gateway_response)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            r.id,
            r.order_id,
            r.amount,
            r.payment_method,
            r.transaction_id,
            r.status,
            r.processed_at,
            r.gateway_response,
        ],
    )?;
    Ok(())
}
