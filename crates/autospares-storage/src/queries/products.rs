// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog queries.

use autospares_core::StoreError;
use autospares_core::types::{Product, ProductQuery};
use rusqlite::{params, params_from_iter, types::Value};

use crate::database::Database;

const PRODUCT_COLUMNS: &str = "id, sku, name, brand, description, category, part_number, \
     price, sale_price, stock_quantity, is_active, image_url";

fn row_to_product(row: &rusqlite::Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        sku: row.get(1)?,
        name: row.get(2)?,
        brand: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        part_number: row.get(6)?,
        price: row.get(7)?,
        sale_price: row.get(8)?,
        stock_quantity: row.get(9)?,
        is_active: row.get(10)?,
        image_url: row.get(11)?,
    })
}

/// Insert a product, or update it in place when the SKU already exists.
pub async fn upsert_product(db: &Database, product: &Product) -> Result<(), StoreError> {
    let p = product.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO products
                    (id, sku, name, brand, description, category, part_number,
                     price, sale_price, stock_quantity, is_active, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(sku) DO UPDATE SET
                    name = excluded.name,
                    brand = excluded.brand,
                    description = excluded.description,
                    category = excluded.category,
                    part_number = excluded.part_number,
                    price = excluded.price,
                    sale_price = excluded.sale_price,
                    stock_quantity = excluded.stock_quantity,
                    is_active = excluded.is_active,
                    image_url = excluded.image_url,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    p.id,
                    p.sku,
                    p.name,
                    p.brand,
                    p.description,
                    p.category,
                    p.part_number,
                    p.price,
                    p.sale_price,
                    p.stock_quantity,
                    p.is_active,
                    p.image_url,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active products matching the query, newest first.
///
/// `search` matches name, brand or description case-insensitively.
pub async fn list_products(
    db: &Database,
    query: &ProductQuery,
) -> Result<Vec<Product>, StoreError> {
    let mut sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1");
    let mut args: Vec<Value> = Vec::new();

    if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
        args.push(Value::Text(category.trim().to_lowercase()));
        sql.push_str(&format!(" AND lower(category) = ?{}", args.len()));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        args.push(Value::Text(format!("%{}%", escape_like(search.trim()))));
        let n = args.len();
        sql.push_str(&format!(
            " AND (name LIKE ?{n} ESCAPE '\\' OR brand LIKE ?{n} ESCAPE '\\' \
             OR description LIKE ?{n} ESCAPE '\\')"
        ));
    }
    args.push(Value::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
    sql.push_str(&format!(
        " ORDER BY created_at DESC, name ASC LIMIT ?{}",
        args.len()
    ));

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(args), row_to_product)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Products with the given ids (active or not), in no particular order.
pub async fn get_products(db: &Database, ids: &[String]) -> Result<Vec<Product>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = (1..=ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ({placeholders})");
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(ids), row_to_product)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;

    pub(crate) fn product(id: &str, name: &str, brand: &str, category: &str, price: f64) -> Product {
        Product {
            id: id.to_string(),
            sku: format!("SKU-{id}"),
            name: name.to_string(),
            brand: Some(brand.to_string()),
            description: Some(format!("{name} by {brand}")),
            category: Some(category.to_string()),
            part_number: None,
            price,
            sale_price: None,
            stock_quantity: 10,
            is_active: true,
            image_url: None,
        }
    }

    async fn seeded() -> (Database, tempfile::TempDir) {
        let (db, dir) = setup_db().await;
        for p in [
            product("p1", "Brake Pads Front", "Bosch", "Brakes", 4500.0),
            product("p2", "Oil Filter", "Mann", "Engine", 900.0),
            product("p3", "Brake Disc", "Brembo", "Brakes", 7800.0),
            product("p4", "Spark Plug 100%", "NGK", "Engine", 650.0),
        ] {
            upsert_product(&db, &p).await.unwrap();
        }
        (db, dir)
    }

    #[tokio::test]
    async fn filters_by_category_case_insensitively() {
        let (db, _dir) = seeded().await;
        let query = ProductQuery {
            category: Some("brakes".into()),
            search: None,
            limit: 10,
        };
        let found = list_products(&db, &query).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.category.as_deref() == Some("Brakes")));
    }

    #[tokio::test]
    async fn search_matches_name_brand_and_description() {
        let (db, _dir) = seeded().await;
        let by_name = ProductQuery {
            search: Some("brake".into()),
            limit: 10,
            ..Default::default()
        };
        assert_eq!(list_products(&db, &by_name).await.unwrap().len(), 2);

        let by_brand = ProductQuery {
            search: Some("MANN".into()),
            limit: 10,
            ..Default::default()
        };
        let found = list_products(&db, &by_brand).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "p2");
    }

    #[tokio::test]
    async fn like_wildcards_in_search_are_literal() {
        let (db, _dir) = seeded().await;
        let query = ProductQuery {
            search: Some("100%".into()),
            limit: 10,
            ..Default::default()
        };
        let found = list_products(&db, &query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "p4");
    }

    #[tokio::test]
    async fn limit_and_inactive_filtering() {
        let (db, _dir) = seeded().await;
        let mut hidden = product("p5", "Hidden Part", "X", "Misc", 1.0);
        hidden.is_active = false;
        upsert_product(&db, &hidden).await.unwrap();

        let all = ProductQuery {
            limit: 100,
            ..Default::default()
        };
        assert_eq!(list_products(&db, &all).await.unwrap().len(), 4);

        let two = ProductQuery {
            limit: 2,
            ..Default::default()
        };
        assert_eq!(list_products(&db, &two).await.unwrap().len(), 2);

        let by_id = get_products(&db, &["p5".to_string()]).await.unwrap();
        assert_eq!(by_id.len(), 1);
        assert!(!by_id[0].is_active);
    }

    #[tokio::test]
    async fn upsert_updates_existing_sku() {
        let (db, _dir) = seeded().await;
        let mut changed = product("p1-new-id", "Brake Pads Front", "Bosch", "Brakes", 4200.0);
        changed.sku = "SKU-p1".to_string();
        upsert_product(&db, &changed).await.unwrap();

        let found = get_products(&db, &["p1".to_string()]).await.unwrap();
        assert_eq!(found[0].price, 4200.0);
    }
}
