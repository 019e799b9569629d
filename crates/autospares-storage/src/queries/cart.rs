// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session cart rows. A sync replaces the whole set atomically.

use autospares_core::StoreError;
use autospares_core::types::CartLine;
use rusqlite::params;

use crate::database::Database;

/// Replace every cart row of `session_id` with `lines`, in one transaction.
///
/// Returns the number of rows written.
pub async fn replace_cart(
    db: &Database,
    session_id: &str,
    lines: &[CartLine],
) -> Result<usize, StoreError> {
    let session_id = session_id.to_string();
    let lines = lines.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM session_cart_items WHERE session_id = ?1",
                params![session_id],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO session_cart_items
                        (session_id, position, product_id, product_name, brand, quantity, unit_price, image_url)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for (position, line) in lines.iter().enumerate() {
                    stmt.execute(params![
                        session_id,
                        position as i64,
                        line.product_id,
                        line.product_name,
                        line.brand,
                        line.quantity,
                        line.unit_price,
                        line.image_url,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(lines.len())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Cart rows of a session in the order they were synced.
pub async fn get_cart(db: &Database, session_id: &str) -> Result<Vec<CartLine>, StoreError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT product_id, product_name, brand, quantity, unit_price, image_url
                 FROM session_cart_items WHERE session_id = ?1
                 ORDER BY position ASC",
            )?;
            let rows = stmt.query_map(params![session_id], |row| {
                Ok(CartLine {
                    product_id: row.get(0)?,
                    product_name: row.get(1)?,
                    brand: row.get(2)?,
                    quantity: row.get(3)?,
                    unit_price: row.get(4)?,
                    image_url: row.get(5)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions::create_session;
    use crate::queries::test_support::{make_session, setup_db};

    fn line(id: &str, qty: u32, price: f64) -> CartLine {
        CartLine {
            product_id: id.to_string(),
            product_name: format!("Part {id}"),
            brand: Some("Bosch".to_string()),
            quantity: qty,
            unit_price: price,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn replace_overwrites_previous_rows() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s", "t")).await.unwrap();

        replace_cart(&db, "s", &[line("a", 1, 100.0), line("b", 2, 50.0)])
            .await
            .unwrap();
        let written = replace_cart(&db, "s", &[line("c", 3, 10.0)]).await.unwrap();
        assert_eq!(written, 1);

        let cart = get_cart(&db, "s").await.unwrap();
        assert_eq!(cart, vec![line("c", 3, 10.0)]);
    }

    #[tokio::test]
    async fn empty_sync_clears_cart() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s", "t")).await.unwrap();
        replace_cart(&db, "s", &[line("a", 1, 100.0)]).await.unwrap();
        replace_cart(&db, "s", &[]).await.unwrap();
        assert!(get_cart(&db, "s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn preserves_line_order() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s", "t")).await.unwrap();
        let lines = vec![line("z", 1, 1.0), line("a", 1, 2.0), line("m", 1, 3.0)];
        replace_cart(&db, "s", &lines).await.unwrap();
        assert_eq!(get_cart(&db, "s").await.unwrap(), lines);
    }

    #[tokio::test]
    async fn zero_quantity_rolls_back_whole_sync() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s", "t")).await.unwrap();
        replace_cart(&db, "s", &[line("a", 1, 100.0)]).await.unwrap();

        let result = replace_cart(&db, "s", &[line("b", 1, 5.0), line("c", 0, 5.0)]).await;
        assert!(result.is_err());
        assert_eq!(get_cart(&db, "s").await.unwrap(), vec![line("a", 1, 100.0)]);
    }

    #[tokio::test]
    async fn carts_are_isolated_per_session() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("s1", "t1")).await.unwrap();
        create_session(&db, &make_session("s2", "t2")).await.unwrap();
        replace_cart(&db, "s1", &[line("a", 1, 1.0)]).await.unwrap();
        replace_cart(&db, "s2", &[line("b", 2, 2.0)]).await.unwrap();
        replace_cart(&db, "s1", &[]).await.unwrap();
        assert_eq!(get_cart(&db, "s2").await.unwrap().len(), 1);
    }
}
